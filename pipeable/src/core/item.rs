//! Opaque items carried through a pipeline run.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// A domain object collected into the execution context.
///
/// The engine never looks inside the payload; host adapters downcast it.
/// Equality is by identity, so two items with the same name are distinct.
#[derive(Clone)]
pub struct Item {
    id: Uuid,
    name: String,
    payload: Arc<dyn Any + Send + Sync>,
}

impl Item {
    /// Creates a new item with a fresh identity.
    #[must_use]
    pub fn new<T>(name: impl Into<String>, payload: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            payload: Arc::new(payload),
        }
    }

    /// Creates an item with no payload beyond its name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, ())
    }

    /// Returns the unique identity.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the payload if it has type `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    /// Returns true if the payload has type `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.payload.is::<T>()
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Item {}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_item_identity() {
        let a = Item::named("a.txt");
        let b = Item::named("a.txt");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_item_downcast() {
        let item = Item::new("a.txt", PathBuf::from("/data/a.txt"));
        assert!(item.is::<PathBuf>());
        assert_eq!(
            item.downcast_ref::<PathBuf>(),
            Some(&PathBuf::from("/data/a.txt"))
        );
        assert!(item.downcast_ref::<String>().is_none());
    }
}
