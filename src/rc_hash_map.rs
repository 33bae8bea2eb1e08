use core::hash::Hash;
use hashbrown::{hash_map::Entry, HashMap};

/// A map of reference-counted values that are only dropped in bulk, through [`RcHashMap::release_unused`].
///
/// Values whose count dropped to zero stay around until then and are revived by the next increment.
#[derive(Debug)]
pub struct RcHashMap<K, V>(HashMap<K, (u16, V)>)
where
	K: Hash + Eq;
impl<K, V> Default for RcHashMap<K, V>
where
	K: Hash + Eq,
{
	fn default() -> Self {
		Self::new()
	}
}
impl<K, V> RcHashMap<K, V>
where
	K: Hash + Eq,
{
	#[must_use]
	pub fn new() -> Self {
		Self(HashMap::new())
	}

	pub fn increment_or_insert_with(&mut self, k: K, v: impl FnOnce(&K) -> V) -> Result<&mut V, CountSaturatedError> {
		match self.0.entry(k) {
			Entry::Occupied(occupied) => {
				let (c, v) = occupied.into_mut();
				*c = c.checked_add(1).ok_or(CountSaturatedError)?;
				Ok(v)
			}
			Entry::Vacant(vacant) => {
				let v = v(vacant.key());
				let (_, v) = vacant.insert((1, v));
				Ok(v)
			}
		}
	}

	/// Decrements the count for `k` without dropping the value.
	///
	/// Returns [`None`] iff `k` isn't present.
	pub fn weak_decrement(&mut self, k: &K) -> Result<Option<&mut V>, CountSaturatedError> {
		match self.0.get_mut(k) {
			Some((c, v)) => {
				*c = c.checked_sub(1).ok_or(CountSaturatedError)?;
				Ok(Some(v))
			}
			None => Ok(None),
		}
	}

	/// Drops all values with a count of zero and returns how many there were.
	pub fn release_unused(&mut self) -> usize {
		let before = self.0.len();
		self.0.retain(|_, (c, _)| *c != 0);
		before - self.0.len()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountSaturatedError;

#[cfg(test)]
mod tests {
	use super::RcHashMap;

	#[test]
	fn values_survive_until_released() {
		let mut map = RcHashMap::<&str, u8>::new();
		map.increment_or_insert_with("click", |_| 1).unwrap();
		map.increment_or_insert_with("click", |_| unreachable!()).unwrap();

		assert_eq!(map.weak_decrement(&"click").unwrap(), Some(&mut 1));
		assert_eq!(map.release_unused(), 0);
		assert_eq!(map.weak_decrement(&"click").unwrap(), Some(&mut 1));
		assert_eq!(map.len(), 1);

		assert_eq!(map.release_unused(), 1);
		assert!(map.is_empty());
		assert_eq!(map.weak_decrement(&"click").unwrap(), None);
	}

	#[test]
	fn decrementing_below_zero_is_an_error() {
		let mut map = RcHashMap::<&str, ()>::new();
		map.increment_or_insert_with("input", |_| ()).unwrap();
		map.weak_decrement(&"input").unwrap();
		assert!(map.weak_decrement(&"input").is_err());
	}
}
