//! Value Objects for the catalog and cart

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Defines a UUID-backed identifier that cannot be mixed up with other entity ids.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh, time-ordered identifier.
            #[must_use]
            pub fn generate() -> Self { Self(Uuid::now_v7()) }

            #[must_use]
            pub const fn from_uuid(id: Uuid) -> Self { Self(id) }

            #[must_use]
            pub const fn as_uuid(&self) -> Uuid { self.0 }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
        }

        impl FromStr for $name {
            type Err = uuid::Error;
            fn from_str(s: &str) -> Result<Self, Self::Err> { Uuid::parse_str(s.trim()).map(Self) }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self { Self(id) }
        }
    };
}

define_id!(
    /// Product document identifier
    ProductId
);
define_id!(
    /// Category document identifier
    CategoryId
);
define_id!(
    /// Authenticated user identifier, only ever taken from a verified token
    UserId
);
define_id!(
    /// Cart line item identifier
    LineItemId
);

/// Positive quantity of a product in a cart
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    /// Largest quantity a cart line can hold (the range of a SQL `INTEGER`).
    pub const MAX: u32 = i32::MAX as u32;

    pub fn new(value: u32) -> Result<Self, QuantityError> {
        if value == 0 { return Err(QuantityError::Zero); }
        if value > Self::MAX { return Err(QuantityError::TooLarge); }
        Ok(Self(value))
    }
    pub fn value(&self) -> u32 { self.0 }
    /// `None` when the sum exceeds [`Quantity::MAX`].
    pub fn checked_add(&self, other: Quantity) -> Option<Self> {
        self.0.checked_add(other.0).filter(|sum| *sum <= Self::MAX).map(Self)
    }
}

impl TryFrom<i32> for Quantity {
    type Error = QuantityError;
    fn try_from(value: i32) -> Result<Self, Self::Error> {
        u32::try_from(value).map_err(|_| QuantityError::Zero).and_then(Self::new)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum QuantityError { Zero, TooLarge }
impl std::error::Error for QuantityError {}
impl fmt::Display for QuantityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zero => write!(f, "Quantity must be a positive integer"),
            Self::TooLarge => write!(f, "Quantity must not exceed {}", Quantity::MAX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_id_parse() {
        let id = ProductId::generate();
        assert_eq!(id.to_string().parse::<ProductId>().unwrap(), id);
        assert!("not-an-id".parse::<ProductId>().is_err());
    }
    #[test]
    fn test_quantity() {
        assert_eq!(Quantity::new(0), Err(QuantityError::Zero));
        assert_eq!(Quantity::try_from(-3), Err(QuantityError::Zero));
        let q = Quantity::new(2).unwrap().checked_add(Quantity::new(3).unwrap()).unwrap();
        assert_eq!(q.value(), 5);
        assert_eq!(Quantity::new(Quantity::MAX + 1), Err(QuantityError::TooLarge));
        let max = Quantity::new(Quantity::MAX).unwrap();
        assert_eq!(max.checked_add(Quantity::new(1).unwrap()), None);
    }
}
