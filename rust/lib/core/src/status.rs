/// Declare a workflow status enum stored as a SCREAMING_SNAKE string.
///
/// ```ignore
/// status_enum! {
///     /// Lifecycle of a movement.
///     MovementStatus {
///         Delivering => "DELIVERING",
///         Received => "RECEIVED",
///     }
/// }
/// ```
///
/// Generates serde renames, `as_str`, `parse`, `ALL` and `Display`. The
/// calling crate must depend on `serde`.
#[macro_export]
macro_rules! status_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

#[cfg(test)]
mod tests {
    status_enum! {
        Light {
            Red => "RED",
            AmberFlash => "AMBER_FLASH",
        }
    }

    #[test]
    fn generated_helpers() {
        assert_eq!(Light::AmberFlash.as_str(), "AMBER_FLASH");
        assert_eq!(Light::parse("RED"), Some(Light::Red));
        assert_eq!(Light::parse("red"), None);
        assert_eq!(Light::ALL.len(), 2);
        assert_eq!(serde_json::to_string(&Light::AmberFlash).unwrap(), "\"AMBER_FLASH\"");
        assert_eq!(Light::Red.to_string(), "RED");
    }
}
