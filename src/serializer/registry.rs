//! Регистрация форм объектов и пользовательских кодеков.
//!
//! [`Registry`] строится один раз при старте через [`RegistryBuilder`] и
//! дальше используется по ссылке. Решения по типу (какой кодек его
//! обрабатывает, какой конструктор восстанавливает объект) принимаются при
//! первом обращении и кэшируются.

use std::{collections::HashMap, fmt, sync::Arc};

use nvstore_error::{SerResult, SerializerError};
use parking_lot::RwLock;
use tracing::{debug, trace};

use super::{decode::Decoder, encode::Encoder, Value};

/// Точка расширения для типов, которые базовый формат не выражает.
///
/// Кодеки опрашиваются в порядке регистрации; первый, у которого
/// [`supports_type`](CustomCodec::supports_type) вернул `true`, отвечает
/// и за кодирование, и за декодирование этого типа.
pub trait CustomCodec: Send + Sync {
    /// Имя для логов.
    fn name(&self) -> &str;

    fn supports_type(
        &self,
        type_name: &str,
    ) -> bool;

    /// Пишет данные, следующие за тегом `Custom` и индексом типа.
    fn encode(
        &self,
        value: &Value,
        enc: &mut Encoder<'_>,
    ) -> SerResult<()>;

    fn decode(
        &self,
        type_name: &str,
        dec: &mut Decoder<'_>,
    ) -> SerResult<Value>;
}

/// Именованный типизированный слот: свойство объекта или параметр конструктора.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub type_name: String,
}

impl Member {
    pub fn new(
        name: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }

    /// Имя без учёта регистра и точное совпадение типа.
    fn matches(
        &self,
        other: &Member,
    ) -> bool {
        self.name.eq_ignore_ascii_case(&other.name) && self.type_name == other.type_name
    }
}

impl fmt::Display for Member {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.type_name)
    }
}

/// Публичная поверхность простого типа данных: свойства в порядке объявления
/// и все публичные конструкторы.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectShape {
    type_name: String,
    properties: Vec<Member>,
    constructors: Vec<Vec<Member>>,
}

impl ObjectShape {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            properties: Vec::new(),
            constructors: Vec::new(),
        }
    }

    pub fn property(
        mut self,
        name: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        self.properties.push(Member::new(name, type_name));
        self
    }

    pub fn constructor<I, N, T>(
        mut self,
        params: I,
    ) -> Self
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: Into<String>,
    {
        self.constructors
            .push(params.into_iter().map(|(n, t)| Member::new(n, t)).collect());
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn properties(&self) -> &[Member] {
        &self.properties
    }

    /// Сопоставляет каждому параметру конструктора отдельное свойство; `None`,
    /// если параметры не совпадают со свойствами один к одному.
    fn bind(
        &self,
        params: &[Member],
    ) -> Option<Vec<usize>> {
        if params.len() != self.properties.len() {
            return None;
        }
        let mut used = vec![false; self.properties.len()];
        let mut order = Vec::with_capacity(params.len());
        for param in params {
            let slot = (0..self.properties.len())
                .find(|&i| !used[i] && self.properties[i].matches(param))?;
            used[slot] = true;
            order.push(slot);
        }
        Some(order)
    }

    /// Выбирает единственный конструктор, параметры которого совпадают со свойствами.
    pub fn resolve(&self) -> SerResult<ObjectPlan> {
        let mut bound: Vec<Vec<usize>> = self
            .constructors
            .iter()
            .filter_map(|params| self.bind(params))
            .collect();

        if bound.len() != 1 {
            return Err(SerializerError::SchemaMismatch {
                type_name: self.type_name.clone(),
                matched: bound.len(),
                properties: self.properties.iter().map(ToString::to_string).collect(),
                candidates: self
                    .constructors
                    .iter()
                    .map(|params| {
                        let params: Vec<String> = params.iter().map(ToString::to_string).collect();
                        format!("({})", params.join(", "))
                    })
                    .collect(),
            });
        }

        Ok(ObjectPlan {
            type_name: self.type_name.clone(),
            properties: self.properties.iter().map(|p| p.name.clone()).collect(),
            property_types: self.properties.iter().map(|p| p.type_name.clone()).collect(),
            arg_order: bound.remove(0),
        })
    }
}

/// Выбранный конструктор типа объекта.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPlan {
    type_name: String,
    /// Имена свойств в порядке объявления.
    properties: Vec<String>,
    /// Объявленный тип каждого свойства, параллельно `properties`.
    property_types: Vec<String>,
    /// Параметр конструктора `i` соответствует свойству `arg_order[i]`.
    arg_order: Vec<usize>,
}

impl ObjectPlan {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn arity(&self) -> usize {
        self.arg_order.len()
    }

    /// Имена свойств в порядке параметров конструктора.
    pub fn argument_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.arg_order.iter().map(|&i| self.properties[i].as_str())
    }

    /// Сверяет поля объекта с формой и возвращает их значения в порядке
    /// параметров конструктора.
    ///
    /// Каждое поле должно точно называть объявленное свойство и нести значение
    /// объявленного типа. `Null` подходит любому свойству.
    pub fn arguments<'v>(
        &self,
        fields: &'v [(String, Value)],
    ) -> SerResult<Vec<&'v Value>> {
        let mut slots: Vec<Option<&'v Value>> = vec![None; self.properties.len()];
        for (name, value) in fields {
            let slot = self
                .properties
                .iter()
                .position(|p| p == name)
                .ok_or_else(|| SerializerError::UnknownProperty {
                    type_name: self.type_name.clone(),
                    property: name.clone(),
                })?;
            if slots[slot].is_some() {
                return Err(SerializerError::invalid_data(format!(
                    "{} lists property '{name}' twice",
                    self.type_name
                )));
            }
            if let Some(found) = value.type_name() {
                let expected = &self.property_types[slot];
                if found != expected.as_str() {
                    return Err(SerializerError::type_mismatch(
                        format!("{expected} for {}.{name}", self.type_name),
                        found,
                    ));
                }
            }
            slots[slot] = Some(value);
        }

        self.arg_order
            .iter()
            .map(|&i| {
                slots[i].ok_or_else(|| SerializerError::MissingProperty {
                    type_name: self.type_name.clone(),
                    property: self.properties[i].clone(),
                })
            })
            .collect()
    }

    /// Вызывает конструктор позиционно: раскладывает декодированные аргументы
    /// по свойствам и возвращает объект со свойствами в порядке
    /// объявления.
    pub fn construct(
        &self,
        args: Vec<Value>,
    ) -> SerResult<Value> {
        if args.len() != self.arg_order.len() {
            return Err(SerializerError::invalid_data(format!(
                "{} expects {} constructor arguments, got {}",
                self.type_name,
                self.arg_order.len(),
                args.len()
            )));
        }
        let mut slots: Vec<Option<Value>> = vec![None; self.properties.len()];
        for (arg, &slot) in args.into_iter().zip(&self.arg_order) {
            slots[slot] = Some(arg);
        }
        let fields = self
            .properties
            .iter()
            .zip(slots)
            .map(|(name, slot)| {
                slot.map(|v| (name.clone(), v))
                    .ok_or_else(|| SerializerError::MissingProperty {
                        type_name: self.type_name.clone(),
                        property: name.clone(),
                    })
            })
            .collect::<SerResult<Vec<_>>>()?;
        Ok(Value::Object {
            type_name: self.type_name.clone(),
            fields,
        })
    }
}

/// Типы, форму которых можно зарегистрировать напрямую.
pub trait PersistObject {
    fn shape() -> ObjectShape;
}

/// Как имя из сохранённой таблицы разрешается в реестре.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Обрабатывается указанным пользовательским кодеком.
    Codec(String),
    /// Зарегистрированный объект с корректным конструктором.
    Object,
    /// Примитив или структурный тип, не требующий регистрации.
    Structural,
}

#[derive(Default)]
pub struct RegistryBuilder {
    codecs: Vec<Arc<dyn CustomCodec>>,
    shapes: HashMap<String, ObjectShape>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Добавляет кодек; ранее зарегистрированные имеют приоритет.
    pub fn register_codec<C: CustomCodec + 'static>(
        &mut self,
        codec: C,
    ) -> &mut Self {
        debug!(codec = codec.name(), "registered custom codec");
        self.codecs.push(Arc::new(codec));
        self
    }

    /// Регистрирует форму объекта, заменяя прежнюю с тем же именем.
    pub fn register_object(
        &mut self,
        shape: ObjectShape,
    ) -> &mut Self {
        self.shapes.insert(shape.type_name.clone(), shape);
        self
    }

    pub fn register<T: PersistObject>(&mut self) -> &mut Self {
        self.register_object(T::shape())
    }

    pub fn build(self) -> Registry {
        Registry {
            codecs: self.codecs,
            shapes: self.shapes,
            codec_cache: RwLock::new(HashMap::new()),
            plan_cache: RwLock::new(HashMap::new()),
        }
    }
}

pub struct Registry {
    codecs: Vec<Arc<dyn CustomCodec>>,
    shapes: HashMap<String, ObjectShape>,
    /// Индекс в `codecs` для имени типа; `None`, если кодека нет.
    codec_cache: RwLock<HashMap<String, Option<usize>>>,
    plan_cache: RwLock<HashMap<String, Arc<ObjectPlan>>>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Реестр без кодеков и форм.
    pub fn empty() -> Self {
        RegistryBuilder::new().build()
    }

    pub fn has_shape(
        &self,
        type_name: &str,
    ) -> bool {
        self.shapes.contains_key(type_name)
    }

    /// Первый кодек, поддерживающий `type_name`.
    pub fn codec_for(
        &self,
        type_name: &str,
    ) -> Option<Arc<dyn CustomCodec>> {
        if self.codecs.is_empty() {
            return None;
        }
        let cached = self.codec_cache.read().get(type_name).copied();
        let index = match cached {
            Some(index) => index,
            None => {
                let index = self.codecs.iter().position(|c| c.supports_type(type_name));
                trace!(type_name, ?index, "resolved codec");
                self.codec_cache
                    .write()
                    .insert(type_name.to_string(), index);
                index
            }
        };
        index.map(|i| Arc::clone(&self.codecs[i]))
    }

    /// План конструктора зарегистрированного типа объекта.
    ///
    /// Успешные разрешения кэшируются; `SchemaMismatch` возвращается
    /// при каждой попытке.
    pub fn object_plan(
        &self,
        type_name: &str,
    ) -> SerResult<Arc<ObjectPlan>> {
        if let Some(plan) = self.plan_cache.read().get(type_name) {
            return Ok(Arc::clone(plan));
        }
        let shape = self
            .shapes
            .get(type_name)
            .ok_or_else(|| SerializerError::UnsupportedType {
                type_name: type_name.to_string(),
            })?;
        let plan = Arc::new(shape.resolve()?);
        self.plan_cache
            .write()
            .insert(type_name.to_string(), Arc::clone(&plan));
        Ok(plan)
    }

    /// Разрешает имя типа заранее, до первого использования.
    pub fn prime(
        &self,
        type_name: &str,
    ) -> SerResult<Resolution> {
        if let Some(codec) = self.codec_for(type_name) {
            return Ok(Resolution::Codec(codec.name().to_string()));
        }
        if self.has_shape(type_name) {
            self.object_plan(type_name)?;
            return Ok(Resolution::Object);
        }
        Ok(Resolution::Structural)
    }
}

impl fmt::Debug for Registry {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let codecs: Vec<&str> = self.codecs.iter().map(|c| c.name()).collect();
        let mut shapes: Vec<&String> = self.shapes.keys().collect();
        shapes.sort();
        f.debug_struct("Registry")
            .field("codecs", &codecs)
            .field("shapes", &shapes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wager() -> ObjectShape {
        ObjectShape::new("game.Wager")
            .property("Denom", "i64")
            .property("Lines", "i32")
    }

    #[test]
    fn test_unique_constructor_resolves() {
        let plan = wager()
            .constructor([("lines", "i32"), ("denom", "i64")])
            .constructor([("denom", "i64")])
            .resolve()
            .unwrap();
        assert_eq!(plan.arity(), 2);
        assert_eq!(plan.argument_names().collect::<Vec<_>>(), vec!["Lines", "Denom"]);
    }

    #[test]
    fn test_two_matching_constructors_is_mismatch() {
        let err = wager()
            .constructor([("denom", "i64"), ("lines", "i32")])
            .constructor([("lines", "i32"), ("denom", "i64")])
            .resolve()
            .unwrap_err();
        match err {
            SerializerError::SchemaMismatch {
                type_name,
                matched,
                properties,
                candidates,
            } => {
                assert_eq!(type_name, "game.Wager");
                assert_eq!(matched, 2);
                assert_eq!(properties, vec!["Denom: i64", "Lines: i32"]);
                assert_eq!(candidates.len(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_constructor_missing_property_is_mismatch() {
        let err = wager().constructor([("denom", "i64")]).resolve().unwrap_err();
        assert!(matches!(err, SerializerError::SchemaMismatch { matched: 0, .. }));
    }

    #[test]
    fn test_type_must_match_exactly() {
        let err = wager()
            .constructor([("denom", "i32"), ("lines", "i32")])
            .resolve()
            .unwrap_err();
        assert!(matches!(err, SerializerError::SchemaMismatch { matched: 0, .. }));
    }

    #[test]
    fn test_construct_reorders_arguments() {
        let plan = wager()
            .constructor([("lines", "i32"), ("denom", "i64")])
            .resolve()
            .unwrap();
        let value = plan
            .construct(vec![Value::Int32(20), Value::Int64(5)])
            .unwrap();
        assert_eq!(
            value,
            Value::object(
                "game.Wager",
                [("Denom", Value::Int64(5)), ("Lines", Value::Int32(20))]
            )
        );
        assert!(plan.construct(vec![Value::Int32(1)]).is_err());
    }

    #[test]
    fn test_arguments_follow_constructor_order() {
        let plan = wager()
            .constructor([("lines", "i32"), ("denom", "i64")])
            .resolve()
            .unwrap();
        let fields = vec![
            ("Denom".to_string(), Value::Int64(5)),
            ("Lines".to_string(), Value::Null),
        ];
        let args = plan.arguments(&fields).unwrap();
        assert_eq!(args, vec![&Value::Null, &Value::Int64(5)]);
    }

    #[test]
    fn test_arguments_reject_undeclared_field() {
        let plan = wager()
            .constructor([("denom", "i64"), ("lines", "i32")])
            .resolve()
            .unwrap();
        let fields = vec![
            ("Denom".to_string(), Value::Int64(5)),
            ("Lines".to_string(), Value::Int32(25)),
            ("Bonus".to_string(), Value::Bool(true)),
        ];
        let err = plan.arguments(&fields).unwrap_err();
        assert!(matches!(err, SerializerError::UnknownProperty { ref property, .. } if property == "Bonus"));
    }

    #[test]
    fn test_arguments_reject_wrong_value_type() {
        let plan = wager()
            .constructor([("denom", "i64"), ("lines", "i32")])
            .resolve()
            .unwrap();
        let fields = vec![
            ("Denom".to_string(), Value::from("not-an-i64")),
            ("Lines".to_string(), Value::Int32(25)),
        ];
        match plan.arguments(&fields).unwrap_err() {
            SerializerError::TypeMismatch { expected, found } => {
                assert_eq!(expected, "i64 for game.Wager.Denom");
                assert_eq!(found, "string");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_arguments_reject_duplicate_field() {
        let plan = wager()
            .constructor([("denom", "i64"), ("lines", "i32")])
            .resolve()
            .unwrap();
        let fields = vec![
            ("Denom".to_string(), Value::Int64(1)),
            ("Denom".to_string(), Value::Int64(2)),
        ];
        assert!(matches!(
            plan.arguments(&fields).unwrap_err(),
            SerializerError::InvalidData { .. }
        ));
    }

    #[test]
    fn test_unregistered_object_is_unsupported() {
        let registry = Registry::empty();
        assert!(matches!(
            registry.object_plan("game.Nope").unwrap_err(),
            SerializerError::UnsupportedType { .. }
        ));
        assert_eq!(registry.prime("List<i32>").unwrap(), Resolution::Structural);
    }
}
