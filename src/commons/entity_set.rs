//! Insertion-ordered collection of unique entities

/// An item that can live in an [`EntitySet`].
///
/// The key is the natural identity of the item: two items with the same key are
/// the same entity as far as the set is concerned.
pub trait Entity {
    /// Natural key used for deduplication and lookup
    fn key(&self) -> &str;
}

impl Entity for String {
    fn key(&self) -> &str {
        self
    }
}

/// Unique ordered collection.
///
/// Items keep the order in which they were first added. Adding an item whose key
/// is already present leaves the set untouched. Lookups are linear scans, which
/// is fine for the handful of entities a descriptor holds.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySet<T> {
    items: Vec<T>,
}

impl<T> Default for EntitySet<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Entity> EntitySet<T> {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item, returning false when an item with the same key exists
    pub fn add(&mut self, item: T) -> bool {
        if self.has(item.key()) {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Remove the item with the given key
    pub fn delete(&mut self, key: &str) -> Option<T> {
        let index = self.items.iter().position(|item| item.key() == key)?;
        Some(self.items.remove(index))
    }

    /// Check whether an item with the given key is present
    pub fn has(&self, key: &str) -> bool {
        self.items.iter().any(|item| item.key() == key)
    }

    /// Get an item by key
    pub fn get(&self, key: &str) -> Option<&T> {
        self.items.iter().find(|item| item.key() == key)
    }

    /// Get a mutable item by key.
    ///
    /// Changing the key through the returned reference is not detected.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut T> {
        self.items.iter_mut().find(|item| item.key() == key)
    }

    /// First item matching an arbitrary attribute predicate
    pub fn find<P>(&self, mut predicate: P) -> Option<&T>
    where
        P: FnMut(&T) -> bool,
    {
        self.items.iter().find(|item| predicate(item))
    }

    /// Transform every item, in insertion order
    pub fn map<U, F>(&self, f: F) -> Vec<U>
    where
        F: FnMut(&T) -> U,
    {
        self.items.iter().map(f).collect()
    }

    /// Keep only the items matching the predicate
    pub fn retain<P>(&mut self, predicate: P)
    where
        P: FnMut(&T) -> bool,
    {
        self.items.retain(predicate);
    }

    /// Iterate over the items
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Iterate mutably over the items.
    ///
    /// Changing keys through the returned references is not detected.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Keys of every item, in insertion order
    pub fn keys(&self) -> Vec<String> {
        self.map(|item| item.key().to_string())
    }
}

impl<T: Entity> FromIterator<T> for EntitySet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        for item in iter {
            set.add(item);
        }
        set
    }
}

impl<T: Entity> Extend<T> for EntitySet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.add(item);
        }
    }
}

impl<T> IntoIterator for EntitySet<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a EntitySet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Named {
        name: String,
        size: u32,
    }

    impl Named {
        fn new(name: &str, size: u32) -> Self {
            Self {
                name: name.to_string(),
                size,
            }
        }
    }

    impl Entity for Named {
        fn key(&self) -> &str {
            &self.name
        }
    }

    #[test]
    fn test_add_is_noop_for_same_key() {
        let mut set = EntitySet::new();
        assert!(set.add(Named::new("a", 1)));
        assert!(!set.add(Named::new("a", 2)));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("a").unwrap().size, 1);
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let set: EntitySet<Named> = vec![
            Named::new("c", 1),
            Named::new("a", 2),
            Named::new("c", 3),
            Named::new("b", 4),
        ]
        .into_iter()
        .collect();

        assert_eq!(set.keys(), vec!["c", "a", "b"]);
        assert_eq!(set.map(|item| item.size), vec![1, 2, 4]);
    }

    #[test]
    fn test_delete_and_has() {
        let mut set = EntitySet::new();
        set.add(Named::new("a", 1));
        set.add(Named::new("b", 2));

        let removed = set.delete("a").unwrap();
        assert_eq!(removed.size, 1);
        assert!(!set.has("a"));
        assert!(set.has("b"));
        assert!(set.delete("missing").is_none());
    }

    #[test]
    fn test_find_by_attribute() {
        let mut set = EntitySet::new();
        set.add(Named::new("a", 1));
        set.add(Named::new("b", 2));
        set.add(Named::new("c", 2));

        assert_eq!(set.find(|item| item.size == 2).unwrap().name, "b");
        assert!(set.find(|item| item.size == 9).is_none());
    }
}
