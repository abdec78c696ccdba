//! Array storage.
//!
//! An array owns a dense, row-major vector of cells and the inclusive
//! `(lower, upper)` bounds of each dimension. The last subscript varies
//! fastest, so for `DIM A(1 TO 3, 1 TO 2)` the slots are laid out as
//! `A(1,1) A(1,2) A(2,1) A(2,2) A(3,1) A(3,2)`.

use super::{Cell, Type, Value, ValueError, cell};
use std::rc::Rc;

/// Upper bound of an array created by first use, without DIM.
pub const IMPLICIT_UPPER_BOUND: i64 = 10;

/// Most slots a single array may hold, across all dimensions.
pub const MAX_SLOTS: usize = 1 << 22;

/// A multi-dimensional array value.
#[derive(Debug, PartialEq)]
pub struct ArrayValue {
    element: Type,
    bounds: Vec<(i64, i64)>,
    slots: Vec<Cell>,
}

impl Clone for ArrayValue {
    /// Deep copy: the clone owns fresh slot cells.
    fn clone(&self) -> Self {
        Self {
            element: self.element.clone(),
            bounds: self.bounds.clone(),
            slots: self
                .slots
                .iter()
                .map(|slot| cell(slot.borrow().clone()))
                .collect(),
        }
    }
}

fn slot_count(bounds: &[(i64, i64)]) -> Result<usize, ValueError> {
    let too_large = || ValueError::OutOfMemory("array too large".to_string());
    bounds.iter().try_fold(1usize, |acc, &(lower, upper)| {
        if lower > upper {
            return Err(ValueError::SubscriptOutOfRange);
        }
        let extent = upper
            .checked_sub(lower)
            .and_then(|n| n.checked_add(1))
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(too_large)?;
        acc.checked_mul(extent)
            .filter(|&n| n <= MAX_SLOTS)
            .ok_or_else(too_large)
    })
}

impl ArrayValue {
    /// Creates an array with every slot at the element type's default.
    ///
    /// Fails if any dimension has `lower > upper`.
    pub fn new(element: Type, bounds: Vec<(i64, i64)>) -> Result<Self, ValueError> {
        let count = slot_count(&bounds)?;
        let slots = (0..count).map(|_| cell(element.default_value())).collect();
        Ok(Self {
            element,
            bounds,
            slots,
        })
    }

    /// An array of `dims` dimensions, each `0 TO 10`.
    pub fn implicit(element: Type, dims: usize) -> Self {
        let bounds = vec![(0, IMPLICIT_UPPER_BOUND); dims.max(1)];
        let count = (IMPLICIT_UPPER_BOUND as usize + 1).pow(bounds.len() as u32);
        let slots = (0..count).map(|_| cell(element.default_value())).collect();
        Self {
            element,
            bounds,
            slots,
        }
    }

    pub fn element(&self) -> &Type {
        &self.element
    }

    pub fn bounds(&self) -> &[(i64, i64)] {
        &self.bounds
    }

    /// Number of slots in the backing store.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Row-major offset of `indices` into the backing store.
    pub fn offset(&self, indices: &[i64]) -> Result<usize, ValueError> {
        if indices.len() != self.bounds.len() {
            return Err(ValueError::SubscriptOutOfRange);
        }
        let mut offset = 0usize;
        for (&index, &(lower, upper)) in indices.iter().zip(&self.bounds) {
            if index < lower || index > upper {
                return Err(ValueError::SubscriptOutOfRange);
            }
            let extent = (upper - lower + 1) as usize;
            offset = offset * extent + (index - lower) as usize;
        }
        Ok(offset)
    }

    /// The cell at `indices`.
    pub fn get(&self, indices: &[i64]) -> Result<Cell, ValueError> {
        let offset = self.offset(indices)?;
        Ok(Rc::clone(&self.slots[offset]))
    }

    /// Stores `value` at `indices`, coerced to the element type.
    pub fn set(&self, indices: &[i64], value: &Value) -> Result<(), ValueError> {
        let coerced = self.element.copy(value)?;
        *self.get(indices)?.borrow_mut() = coerced;
        Ok(())
    }

    /// Lower bound of 1-based dimension `dim`.
    pub fn lbound(&self, dim: usize) -> Option<i64> {
        dim.checked_sub(1)
            .and_then(|d| self.bounds.get(d))
            .map(|&(lower, _)| lower)
    }

    /// Upper bound of 1-based dimension `dim`.
    pub fn ubound(&self, dim: usize) -> Option<i64> {
        dim.checked_sub(1)
            .and_then(|d| self.bounds.get(d))
            .map(|&(_, upper)| upper)
    }

    /// Changes the array's bounds.
    ///
    /// Without `preserve` every slot is reset to the default. With it the
    /// backing store is truncated or extended at the tail; existing slots
    /// keep their position in the store and are never reindexed.
    pub fn resize(&mut self, bounds: Vec<(i64, i64)>, preserve: bool) -> Result<(), ValueError> {
        let count = slot_count(&bounds)?;
        if preserve {
            if count < self.slots.len() {
                self.slots.truncate(count);
            } else {
                let element = &self.element;
                self.slots
                    .extend((self.slots.len()..count).map(|_| cell(element.default_value())));
            }
        } else {
            self.slots = (0..count)
                .map(|_| cell(self.element.default_value()))
                .collect();
        }
        self.bounds = bounds;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_dimensional_layout() {
        let array = ArrayValue::new(Type::Integer, vec![(1, 3), (1, 2)]).unwrap();
        assert_eq!(array.len(), 6);
        assert_eq!(array.offset(&[1, 1]).unwrap(), 0);
        assert_eq!(array.offset(&[2, 2]).unwrap(), 3);
        assert_eq!(array.offset(&[3, 2]).unwrap(), 5);
    }

    #[test]
    fn test_offset_is_stable() {
        let array = ArrayValue::new(Type::Integer, vec![(1, 3), (1, 2)]).unwrap();
        let first = array.offset(&[2, 2]).unwrap();
        array.offset(&[3, 1]).unwrap();
        array.offset(&[1, 2]).unwrap();
        assert_eq!(array.offset(&[2, 2]).unwrap(), first);
    }

    #[test]
    fn test_out_of_range() {
        let array = ArrayValue::new(Type::Integer, vec![(1, 3)]).unwrap();
        assert_eq!(array.offset(&[0]), Err(ValueError::SubscriptOutOfRange));
        assert_eq!(array.offset(&[4]), Err(ValueError::SubscriptOutOfRange));
        assert_eq!(array.offset(&[1, 1]), Err(ValueError::SubscriptOutOfRange));
        assert!(ArrayValue::new(Type::Integer, vec![(5, 1)]).is_err());
    }

    #[test]
    fn test_extreme_bounds_are_refused() {
        let err = ArrayValue::new(Type::Integer, vec![(i64::MIN, i64::MAX)]).unwrap_err();
        assert!(matches!(err, ValueError::OutOfMemory(_)));
        let err = ArrayValue::new(Type::Integer, vec![(1, 1_000_000_000)]).unwrap_err();
        assert!(matches!(err, ValueError::OutOfMemory(_)));
        // Each dimension fits, the product does not.
        let err = ArrayValue::new(Type::Integer, vec![(1, 4096), (1, 4096)]).unwrap_err();
        assert!(matches!(err, ValueError::OutOfMemory(_)));

        let mut array = ArrayValue::new(Type::Integer, vec![(1, 3)]).unwrap();
        assert!(array.resize(vec![(0, i64::MAX)], true).is_err());
        assert_eq!(array.len(), 3);
        assert_eq!(array.ubound(1), Some(3));
    }

    #[test]
    fn test_set_coerces() {
        let array = ArrayValue::new(Type::Integer, vec![(1, 3)]).unwrap();
        array.set(&[2], &Value::Long(32768)).unwrap();
        assert_eq!(*array.get(&[2]).unwrap().borrow(), Value::Integer(-32768));
    }

    #[test]
    fn test_resize_preserve_keeps_prefix() {
        let mut array = ArrayValue::new(Type::Long, vec![(0, 2)]).unwrap();
        array.set(&[1], &Value::Long(7)).unwrap();
        array.resize(vec![(0, 5)], true).unwrap();
        assert_eq!(array.len(), 6);
        assert_eq!(*array.get(&[1]).unwrap().borrow(), Value::Long(7));
        assert_eq!(*array.get(&[5]).unwrap().borrow(), Value::Long(0));

        array.resize(vec![(0, 1)], true).unwrap();
        assert_eq!(array.len(), 2);
        assert_eq!(*array.get(&[1]).unwrap().borrow(), Value::Long(7));
    }

    #[test]
    fn test_resize_without_preserve_clears() {
        let mut array = ArrayValue::new(Type::String, vec![(0, 2)]).unwrap();
        array.set(&[0], &Value::from("x")).unwrap();
        array.resize(vec![(0, 2)], false).unwrap();
        assert_eq!(*array.get(&[0]).unwrap().borrow(), Value::from(""));
    }

    #[test]
    fn test_implicit_bounds() {
        let array = ArrayValue::implicit(Type::Single, 1);
        assert_eq!(array.lbound(1), Some(0));
        assert_eq!(array.ubound(1), Some(IMPLICIT_UPPER_BOUND));
        assert_eq!(array.ubound(2), None);
        assert_eq!(array.len(), 11);
    }

    #[test]
    fn test_clone_is_deep() {
        let array = ArrayValue::new(Type::Integer, vec![(1, 2)]).unwrap();
        let copy = array.clone();
        copy.set(&[1], &Value::Integer(9)).unwrap();
        assert_eq!(*array.get(&[1]).unwrap().borrow(), Value::Integer(0));
    }
}
