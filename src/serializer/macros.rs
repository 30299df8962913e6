/// Объявляет C-подобный enum, сохраняемый через целочисленный дискриминант.
///
/// ```
/// nvstore::persist_enum! {
///     pub enum Denom: u8 as "game.Denom" {
///         Penny = 1,
///         Nickel = 5,
///     }
/// }
/// ```
#[macro_export]
macro_rules! persist_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $repr:ident as $type_name:literal {
            $($(#[$vmeta:meta])* $variant:ident = $disc:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr($repr)]
        $vis enum $name {
            $($(#[$vmeta])* $variant = $disc),+
        }

        impl $crate::serializer::Persist for $name {
            fn type_name() -> ::std::string::String {
                ::std::string::String::from($type_name)
            }

            fn to_value(&self) -> $crate::serializer::Value {
                $crate::serializer::Value::Enum {
                    type_name: ::std::string::String::from($type_name),
                    value: ::std::boxed::Box::new(
                        <$repr as $crate::serializer::Persist>::to_value(&(*self as $repr)),
                    ),
                }
            }

            fn from_value(value: $crate::serializer::Value) -> $crate::SerResult<Self> {
                match value {
                    $crate::serializer::Value::Enum { type_name, value } if type_name == $type_name => {
                        let raw = <$repr as $crate::serializer::Persist>::from_value(*value)?;
                        $(
                            if raw == $name::$variant as $repr {
                                return Ok($name::$variant);
                            }
                        )+
                        Err($crate::SerializerError::invalid_data(format!(
                            "{} has no variant with value {}",
                            $type_name, raw
                        )))
                    }
                    other => Err($crate::serializer::unexpected($type_name, &other)),
                }
            }
        }
    };
}

/// Объявляет простую структуру данных, сохраняемую как объект.
///
/// Сгенерированная форма имеет один конструктор со всеми полями в порядке
/// объявления, поэтому её можно зарегистрировать через
/// [`RegistryBuilder::register`](crate::serializer::RegistryBuilder::register).
#[macro_export]
macro_rules! persist_object {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident as $type_name:literal {
            $($(#[$fmeta:meta])* $fvis:vis $field:ident : $fty:ty),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $($(#[$fmeta])* $fvis $field: $fty),+
        }

        impl $crate::serializer::PersistObject for $name {
            fn shape() -> $crate::serializer::ObjectShape {
                $crate::serializer::ObjectShape::new($type_name)
                    $(.property(
                        stringify!($field),
                        <$fty as $crate::serializer::Persist>::type_name(),
                    ))+
                    .constructor([
                        $((stringify!($field), <$fty as $crate::serializer::Persist>::type_name())),+
                    ])
            }
        }

        impl $crate::serializer::Persist for $name {
            fn type_name() -> ::std::string::String {
                ::std::string::String::from($type_name)
            }

            fn to_value(&self) -> $crate::serializer::Value {
                $crate::serializer::Value::Object {
                    type_name: ::std::string::String::from($type_name),
                    fields: vec![$((
                        ::std::string::String::from(stringify!($field)),
                        $crate::serializer::Persist::to_value(&self.$field),
                    )),+],
                }
            }

            fn from_value(value: $crate::serializer::Value) -> $crate::SerResult<Self> {
                match value {
                    $crate::serializer::Value::Object { type_name, mut fields } if type_name == $type_name => {
                        Ok(Self {
                            $($field: $crate::serializer::take_field(
                                &mut fields,
                                $type_name,
                                stringify!($field),
                            )?),+
                        })
                    }
                    other => Err($crate::serializer::unexpected($type_name, &other)),
                }
            }
        }
    };
}
