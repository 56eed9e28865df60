/// Declares an integer id newtype stored as `INTEGER` and serialized as a bare number.
macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, AsExpression, FromSqlRow,
        )]
        #[sql_type = "::diesel::sql_types::Integer"]
        pub struct $name(pub i32);

        impl ::diesel::serialize::ToSql<::diesel::sql_types::Integer, ::diesel::pg::Pg> for $name {
            fn to_sql<W: ::std::io::Write>(
                &self,
                out: &mut ::diesel::serialize::Output<W, ::diesel::pg::Pg>,
            ) -> ::diesel::serialize::Result {
                <i32 as ::diesel::serialize::ToSql<::diesel::sql_types::Integer, ::diesel::pg::Pg>>::to_sql(&self.0, out)
            }
        }

        impl ::diesel::deserialize::FromSql<::diesel::sql_types::Integer, ::diesel::pg::Pg> for $name {
            fn from_sql(bytes: Option<&[u8]>) -> ::diesel::deserialize::Result<Self> {
                <i32 as ::diesel::deserialize::FromSql<::diesel::sql_types::Integer, ::diesel::pg::Pg>>::from_sql(bytes).map($name)
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = ::std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<i32>().map($name)
            }
        }

        impl From<i32> for $name {
            fn from(value: i32) -> Self {
                $name(value)
            }
        }
    };
}

/// Declares a fieldless enum stored as `VARCHAR`. Each variant maps to one wire/db string.
macro_rules! varchar_enum {
    ($(#[$meta:meta])* pub enum $name:ident { $($variant:ident => $value:literal,)+ }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, AsExpression, FromSqlRow)]
        #[sql_type = "::diesel::sql_types::VarChar"]
        pub enum $name {
            $($variant,)+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match *self {
                    $($name::$variant => $value,)+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok($name::$variant),)+
                    other => Err(format!("Unknown {} value: {}", stringify!($name), other)),
                }
            }
        }

        impl ::serde::Serialize for $name {
            fn serialize<S: ::serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D: ::serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let value = <String as ::serde::Deserialize>::deserialize(deserializer)?;
                value.parse().map_err(::serde::de::Error::custom)
            }
        }

        impl ::diesel::serialize::ToSql<::diesel::sql_types::VarChar, ::diesel::pg::Pg> for $name {
            fn to_sql<W: ::std::io::Write>(
                &self,
                out: &mut ::diesel::serialize::Output<W, ::diesel::pg::Pg>,
            ) -> ::diesel::serialize::Result {
                <str as ::diesel::serialize::ToSql<::diesel::sql_types::VarChar, ::diesel::pg::Pg>>::to_sql(self.as_str(), out)
            }
        }

        impl ::diesel::deserialize::FromSql<::diesel::sql_types::VarChar, ::diesel::pg::Pg> for $name {
            fn from_sql(bytes: Option<&[u8]>) -> ::diesel::deserialize::Result<Self> {
                let value = <String as ::diesel::deserialize::FromSql<::diesel::sql_types::VarChar, ::diesel::pg::Pg>>::from_sql(bytes)?;
                value.parse().map_err(|e: String| e.into())
            }
        }
    };
}

/// Serializes the item of a controller future into a JSON response.
macro_rules! serialize_future {
    ($e:expr) => {{
        Box::new($e.and_then(|resp| {
            ::serde_json::to_string(&resp)
                .map(::controller::types::ControllerResponse::Json)
                .map_err(|e| e.context(::errors::Error::Parse).into())
        })) as ::controller::types::ControllerFuture
    }};
}
