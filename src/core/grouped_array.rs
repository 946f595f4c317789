//! Packed ragged array holding many series in one buffer.

use crate::error::{Result, TransformError};

/// Many series concatenated into one flat buffer plus an offset index.
///
/// Series `i` occupies `data[indptr[i]..indptr[i + 1]]`. Series are
/// identified by position only, so callers must keep the same ordering
/// across calls to one transform instance.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedArray {
    data: Vec<f64>,
    indptr: Vec<usize>,
}

impl GroupedArray {
    /// Create a grouped array from values and offsets.
    ///
    /// Fails with [`TransformError::InvalidLayout`] when `indptr` is empty,
    /// does not start at zero, decreases, or does not end at `data.len()`.
    pub fn new(data: Vec<f64>, indptr: Vec<usize>) -> Result<Self> {
        validate_indptr(&indptr, data.len())?;
        Ok(Self { data, indptr })
    }

    /// Build from per-series sizes.
    pub fn from_sizes(data: Vec<f64>, sizes: &[usize]) -> Result<Self> {
        Self::new(data, indptr_from_sizes(sizes.iter().copied()))
    }

    /// Build by concatenating owned series.
    pub fn from_groups<S: AsRef<[f64]>>(groups: &[S]) -> Self {
        let total = groups.iter().map(|g| g.as_ref().len()).sum();
        let mut data = Vec::with_capacity(total);
        for g in groups {
            data.extend_from_slice(g.as_ref());
        }
        let indptr = indptr_from_sizes(groups.iter().map(|g| g.as_ref().len()));
        Self { data, indptr }
    }

    /// Empty array with zero series.
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            indptr: vec![0],
        }
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn indptr(&self) -> &[usize] {
        &self.indptr
    }

    /// Consume the array and return its values.
    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    /// Number of series.
    pub fn n_groups(&self) -> usize {
        self.indptr.len() - 1
    }

    /// Total number of values across all series.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Size of each series.
    pub fn sizes(&self) -> Vec<usize> {
        self.indptr.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Values of series `i`.
    ///
    /// # Panics
    /// Panics if `i >= n_groups()`.
    pub fn group(&self, i: usize) -> &[f64] {
        &self.data[self.indptr[i]..self.indptr[i + 1]]
    }

    /// Iterate over the series in order.
    pub fn groups(&self) -> impl ExactSizeIterator<Item = &[f64]> + '_ {
        self.indptr.windows(2).map(|w| &self.data[w[0]..w[1]])
    }

    /// Same layout with new values.
    pub fn with_data(&self, data: Vec<f64>) -> Result<Self> {
        if data.len() != self.data.len() {
            return Err(TransformError::InvalidLayout(format!(
                "expected {} values, got {}",
                self.data.len(),
                data.len()
            )));
        }
        Ok(Self {
            data,
            indptr: self.indptr.clone(),
        })
    }

    /// Gather the series at `idxs` into a new array.
    ///
    /// Positions may appear in any order and more than once.
    pub fn take(&self, idxs: &[usize]) -> Result<Self> {
        let n = self.n_groups();
        let mut data = Vec::new();
        let mut indptr = Vec::with_capacity(idxs.len() + 1);
        indptr.push(0);
        for &i in idxs {
            if i >= n {
                return Err(TransformError::IndexOutOfBounds { index: i, size: n });
            }
            data.extend_from_slice(self.group(i));
            indptr.push(data.len());
        }
        Ok(Self { data, indptr })
    }

    /// Concatenate arrays, shifting each part's offsets by the values before it.
    pub fn concat<'a, I>(parts: I) -> Self
    where
        I: IntoIterator<Item = &'a GroupedArray>,
    {
        let parts: Vec<&GroupedArray> = parts.into_iter().collect();
        let total: usize = parts.iter().map(|p| p.len()).sum();
        let n_groups: usize = parts.iter().map(|p| p.n_groups()).sum();
        let mut data = Vec::with_capacity(total);
        let mut indptr = Vec::with_capacity(n_groups + 1);
        indptr.push(0);
        for part in &parts {
            let offset = data.len();
            data.extend_from_slice(&part.data);
            indptr.extend(part.indptr[1..].iter().map(|&p| p + offset));
        }
        Self { data, indptr }
    }

    /// Last `n` values of every series (fewer if a series is shorter).
    pub fn tails(&self, n: usize) -> Self {
        let groups: Vec<&[f64]> = self
            .groups()
            .map(|g| &g[g.len() - n.min(g.len())..])
            .collect();
        Self::from_groups(&groups)
    }

    /// Last `sizes[i]` values of series `i`.
    pub fn tails_matching(&self, sizes: &[usize]) -> Result<Self> {
        if sizes.len() != self.n_groups() {
            return Err(TransformError::ShapeMismatch {
                expected: self.n_groups(),
                got: sizes.len(),
            });
        }
        let mut groups = Vec::with_capacity(sizes.len());
        for (i, (g, &size)) in self.groups().zip(sizes).enumerate() {
            if size > g.len() {
                return Err(TransformError::Value(format!(
                    "series {i} has {} values, cannot take the last {size}",
                    g.len()
                )));
            }
            groups.push(&g[g.len() - size..]);
        }
        Ok(Self::from_groups(&groups))
    }

    /// Shift every series forward by `d`, filling the first `d` positions with NaN.
    pub fn lag(&self, d: usize) -> Self {
        let mut data = Vec::with_capacity(self.data.len());
        for g in self.groups() {
            let fill = d.min(g.len());
            data.extend(std::iter::repeat_n(f64::NAN, fill));
            data.extend_from_slice(&g[..g.len() - fill]);
        }
        Self {
            data,
            indptr: self.indptr.clone(),
        }
    }
}

impl Default for GroupedArray {
    fn default() -> Self {
        Self::empty()
    }
}

/// Check the offset index against the data length.
fn validate_indptr(indptr: &[usize], data_len: usize) -> Result<()> {
    let Some(&first) = indptr.first() else {
        return Err(TransformError::InvalidLayout(
            "indptr must contain at least one offset".to_string(),
        ));
    };
    if first != 0 {
        return Err(TransformError::InvalidLayout(format!(
            "indptr must start at 0, got {first}"
        )));
    }
    if let Some(pos) = indptr.windows(2).position(|w| w[1] < w[0]) {
        return Err(TransformError::InvalidLayout(format!(
            "indptr decreases at position {}",
            pos + 1
        )));
    }
    let last = indptr[indptr.len() - 1];
    if last != data_len {
        return Err(TransformError::InvalidLayout(format!(
            "indptr ends at {last} but data has {data_len} values"
        )));
    }
    Ok(())
}

/// Cumulative offsets for the given sizes, starting at zero.
fn indptr_from_sizes<I: IntoIterator<Item = usize>>(sizes: I) -> Vec<usize> {
    let mut indptr = vec![0];
    let mut acc = 0;
    for size in sizes {
        acc += size;
        indptr.push(acc);
    }
    indptr
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GroupedArray {
        GroupedArray::new(vec![1.0, 2.0, 3.0, 10.0, 20.0, 100.0], vec![0, 3, 5, 6]).unwrap()
    }

    #[test]
    fn new_valid() {
        let ga = sample();
        assert_eq!(ga.n_groups(), 3);
        assert_eq!(ga.len(), 6);
        assert_eq!(ga.sizes(), vec![3, 2, 1]);
        assert_eq!(ga.group(1), &[10.0, 20.0]);
    }

    #[test]
    fn new_rejects_malformed_indptr() {
        let cases = [
            (vec![], 0),
            (vec![1, 3], 3),
            (vec![0, 3, 2, 4], 4),
            (vec![0, 2], 3),
        ];
        for (indptr, len) in cases {
            let result = GroupedArray::new(vec![0.0; len], indptr);
            assert!(matches!(result, Err(TransformError::InvalidLayout(_))));
        }
    }

    #[test]
    fn empty_groups_are_allowed() {
        let ga = GroupedArray::new(vec![1.0], vec![0, 0, 1, 1]).unwrap();
        assert_eq!(ga.sizes(), vec![0, 1, 0]);
        assert!(ga.group(0).is_empty());
    }

    #[test]
    fn from_groups_and_sizes_agree() {
        let a = GroupedArray::from_groups(&[vec![1.0, 2.0], vec![3.0]]);
        let b = GroupedArray::from_sizes(vec![1.0, 2.0, 3.0], &[2, 1]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn take_reorders_and_duplicates() {
        let ga = sample();
        let taken = ga.take(&[2, 0, 2]).unwrap();
        assert_eq!(taken.indptr(), &[0, 1, 4, 5]);
        assert_eq!(taken.data(), &[100.0, 1.0, 2.0, 3.0, 100.0]);
    }

    #[test]
    fn take_out_of_bounds() {
        let result = sample().take(&[3]);
        assert_eq!(
            result,
            Err(TransformError::IndexOutOfBounds { index: 3, size: 3 })
        );
    }

    #[test]
    fn concat_shifts_offsets() {
        let ga = sample();
        let a = ga.take(&[0]).unwrap();
        let b = ga.take(&[1, 2]).unwrap();
        assert_eq!(GroupedArray::concat(&[a, b]), ga);
    }

    #[test]
    fn tails_clip_to_group_size() {
        let tails = sample().tails(2);
        assert_eq!(tails.indptr(), &[0, 2, 4, 5]);
        assert_eq!(tails.data(), &[2.0, 3.0, 10.0, 20.0, 100.0]);
    }

    #[test]
    fn tails_matching_rejects_oversized_request() {
        let ga = sample();
        assert!(ga.tails_matching(&[1, 1, 1]).is_ok());
        assert!(matches!(
            ga.tails_matching(&[1, 3, 1]),
            Err(TransformError::Value(_))
        ));
    }

    #[test]
    fn lag_fills_leading_positions() {
        let lagged = sample().lag(1);
        let data = lagged.data();
        assert!(data[0].is_nan());
        assert_eq!(&data[1..3], &[1.0, 2.0]);
        assert!(data[3].is_nan());
        assert_eq!(data[4], 10.0);
        assert!(data[5].is_nan());
    }

    #[test]
    fn with_data_checks_length() {
        let ga = sample();
        assert!(ga.with_data(vec![0.0; 6]).is_ok());
        assert!(ga.with_data(vec![0.0; 5]).is_err());
    }
}
