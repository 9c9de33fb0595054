/// Appends `items` at the tail and drops from the head until `seq.len() <= cap`.
///
/// Oldest-first storage: after any sequence of calls, `seq` holds the last
/// `cap` items ever appended, in arrival order.
pub fn append_capped<T>(seq: &mut Vec<T>, items: impl IntoIterator<Item = T>, cap: usize) {
    seq.extend(items);
    if seq.len() > cap {
        let excess = seq.len() - cap;
        seq.drain(..excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn under_cap_keeps_everything() {
        let mut v = vec![1, 2];
        append_capped(&mut v, [3], 5);
        assert_eq!(v, vec![1, 2, 3]);
    }

    #[test]
    fn overflow_evicts_oldest_first() {
        let mut v: Vec<u32> = (1..=5).collect();
        append_capped(&mut v, [6, 7], 5);
        assert_eq!(v, vec![3, 4, 5, 6, 7]);
    }

    #[test]
    fn batch_larger_than_cap_keeps_its_tail() {
        let mut v = vec![0];
        append_capped(&mut v, 1..=10, 3);
        assert_eq!(v, vec![8, 9, 10]);
    }

    #[test]
    fn zero_cap_always_empties() {
        let mut v = vec![1];
        append_capped(&mut v, [2], 0);
        assert!(v.is_empty());
    }
}
