//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create ID wrappers that prevent accidentally
//! mixing IDs from different entity types. Backend rows use `bigint` keys,
//! while auth identities are UUIDs.

/// Macro to define a type-safe ID wrapper around an integer or UUID.
///
/// Creates a newtype wrapper with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`
/// - `new()`, `get()`, `Display`, `FromStr` and `From` conversions
///
/// # Example
///
/// ```rust
/// # use marketstall_core::define_id;
/// define_id!(WidgetId, i64);
/// define_id!(GadgetId, i64);
///
/// let widget = WidgetId::new(1);
/// assert_eq!(widget.to_string(), "1");
/// // let _: GadgetId = widget; // does not compile
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident, $inner:ty) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name($inner);

        impl $name {
            /// Wrap a raw ID value.
            #[must_use]
            pub const fn new(id: $inner) -> Self {
                Self(id)
            }

            /// Get the underlying value.
            #[must_use]
            pub const fn get(&self) -> $inner {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = <$inner as ::core::str::FromStr>::Err;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.parse::<$inner>().map(Self)
            }
        }

        impl From<$inner> for $name {
            fn from(id: $inner) -> Self {
                Self(id)
            }
        }

        impl From<$name> for $inner {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(UserId, uuid::Uuid);
define_id!(ProductId, i64);
define_id!(OrderId, i64);
define_id!(AddressId, i64);
