//! Separable 2D downsampling kernel with optional unsharp-mask sharpening.

/// Largest supported kernel edge.
const MAX_KERNEL_EXTENT: usize = 12;

/// Normalized N×N weight table built as the outer product of a 1D table.
///
/// The 1D table is a positive lobe on the two center taps plus a blurred
/// negative lobe, which approximates an unsharp mask without any runtime
/// filter design. Negative sharpen factors produce a plain Gaussian blur.
#[derive(Debug, Clone)]
pub struct SeparableKernel2D {
    size: usize,
    weights: [f32; MAX_KERNEL_EXTENT * MAX_KERNEL_EXTENT],
}

impl Default for SeparableKernel2D {
    fn default() -> Self {
        Self::new()
    }
}

impl SeparableKernel2D {
    /// An empty kernel; `size()` is 0 until [`SeparableKernel2D::build`] runs.
    pub fn new() -> Self {
        Self {
            size: 0,
            weights: [0.0; MAX_KERNEL_EXTENT * MAX_KERNEL_EXTENT],
        }
    }

    /// Convenience constructor around [`SeparableKernel2D::build`].
    pub fn with_sharpening(table_size: usize, sharpen_factor: f32) -> Self {
        let mut kernel = Self::new();
        kernel.build(table_size, sharpen_factor);
        kernel
    }

    /// Whether [`SeparableKernel2D::build`] accepts this combination.
    pub fn supports(table_size: usize, sharpen_factor: f32) -> bool {
        let table_size = table_size.min(MAX_KERNEL_EXTENT);
        table_size > 0 && (sharpen_factor < 0.0 || matches!(table_size, 2 | 4 | 6 | 8))
    }

    /// Builds the table for `table_size` ∈ {2, 4, 6, 8}.
    ///
    /// # Panics
    ///
    /// Panics on any other size when `sharpen_factor >= 0`; blur-only kernels
    /// accept any size up to the maximum extent.
    pub fn build(&mut self, table_size: usize, sharpen_factor: f32) {
        let table_size = table_size.min(MAX_KERNEL_EXTENT);
        assert!(table_size > 0, "kernel size must be positive");

        let mut table = [0.0f32; MAX_KERNEL_EXTENT];
        let mut negative = [0.0f32; MAX_KERNEL_EXTENT];
        self.size = table_size;

        if sharpen_factor < 0.0 {
            build_gaussian_1d(&mut table[..table_size], 1.0, -sharpen_factor);
            self.outer_product(&table[..table_size]);
            return;
        }

        match table_size {
            2 => {
                self.weights[..4].fill(0.25);
                return;
            }
            4 => {
                build_center_taps(&mut table[..4], 1.0 + sharpen_factor);
                build_center_taps(&mut negative[..4], -sharpen_factor);
                blur_1d(&mut negative[..4], 1);
            }
            6 => {
                build_center_taps(&mut table[..6], 1.0 + sharpen_factor);
                build_center_taps(&mut negative[..6], -sharpen_factor);
                blur_1d(&mut negative[..6], 2);
            }
            8 => {
                // doubled to look like the 6-tap result
                let sharpen_factor = sharpen_factor * 2.0;
                build_center_taps(&mut table[..8], 1.0 + sharpen_factor);
                blur_1d(&mut table[..8], 1);
                build_center_taps(&mut negative[..8], -sharpen_factor);
                blur_1d(&mut negative[..8], 3);
            }
            other => panic!("unsupported sharpening kernel size {other}, expected 2, 4, 6 or 8"),
        }

        for (t, n) in table[..table_size].iter_mut().zip(&negative[..table_size]) {
            *t += *n;
        }
        self.outer_product(&table[..table_size]);
    }

    /// Edge length of the built table, 0 before the first build.
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn weight(&self, x: usize, y: usize) -> f32 {
        assert!(
            x < self.size && y < self.size,
            "kernel lookup ({x}, {y}) outside {0}x{0}",
            self.size
        );
        self.weights[x + y * self.size]
    }

    fn outer_product(&mut self, table: &[f32]) {
        let n = table.len();
        for y in 0..n {
            for x in 0..n {
                self.weights[x + y * n] = table[y] * table[x];
            }
        }
    }
}

fn normal_distribution(x: f32, variance: f32) -> f32 {
    let std_dev = variance.sqrt();
    (-(x * x) / (2.0 * variance)).exp() / (std_dev * (2.0 * std::f32::consts::PI).sqrt())
}

/// Samples a Gaussian at the tap centers and rescales it to `sum`.
fn build_gaussian_1d(table: &mut [f32], sum: f32, variance: f32) {
    let center = table.len() as f32 * 0.5;
    for (i, tap) in table.iter_mut().enumerate() {
        *tap = normal_distribution(i as f32 - center + 0.5, variance);
    }
    let scale = sum / table.iter().sum::<f32>();
    table.iter_mut().for_each(|tap| *tap *= scale);
}

/// Puts `sum / 2` into each of the two center taps of an even table.
fn build_center_taps(table: &mut [f32], sum: f32) {
    assert!(table.len() % 2 == 0, "center-tap tables must have even size");
    let center = table.len() / 2;
    for (x, tap) in table.iter_mut().enumerate() {
        *tap = if x == center || x + 1 == center { 0.5 * sum } else { 0.0 };
    }
}

/// Three-tap running average, repeated `passes` times. Edge taps only
/// average the neighbours that exist.
fn blur_1d(table: &mut [f32], passes: usize) {
    assert!(passes > 0);
    let n = table.len();
    let mut scratch = [0.0f32; MAX_KERNEL_EXTENT];
    for _ in 0..passes {
        scratch[..n].copy_from_slice(table);
        for x in 0..n {
            let mut sum = scratch[x];
            if x > 0 {
                sum += scratch[x - 1];
            }
            if x + 1 < n {
                sum += scratch[x + 1];
            }
            table[x] = sum / 3.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SeparableKernel2D;

    fn kernel_sum(kernel: &SeparableKernel2D) -> f32 {
        let n = kernel.size();
        (0..n)
            .flat_map(|y| (0..n).map(move |x| (x, y)))
            .map(|(x, y)| kernel.weight(x, y))
            .sum()
    }

    #[test]
    fn test_unbuilt_kernel_has_zero_size() {
        assert_eq!(SeparableKernel2D::new().size(), 0);
    }

    #[test]
    fn test_box_kernel_ignores_sharpening() {
        let kernel = SeparableKernel2D::with_sharpening(2, 3.0);
        assert_eq!(kernel.size(), 2);
        for y in 0..2 {
            for x in 0..2 {
                assert_eq!(kernel.weight(x, y), 0.25);
            }
        }
    }

    #[test]
    fn test_weights_sum_to_one() {
        for size in [2, 4, 6, 8] {
            for sharpen in [-4.0, -1.0, -0.25, 0.0, 0.2, 1.0, 2.5] {
                let kernel = SeparableKernel2D::with_sharpening(size, sharpen);
                let sum = kernel_sum(&kernel);
                assert!(
                    (sum - 1.0).abs() < 1e-4,
                    "size {size} sharpen {sharpen}: sum {sum}"
                );
            }
        }
    }

    #[test]
    fn test_sharpening_creates_negative_lobe() {
        let kernel = SeparableKernel2D::with_sharpening(6, 1.0);
        // corner taps pick up the subtracted blur
        assert!(kernel.weight(1, 2) < 0.0);
        assert!(kernel.weight(2, 2) > 0.25);
    }

    #[test]
    fn test_kernel_is_symmetric() {
        let kernel = SeparableKernel2D::with_sharpening(8, 0.5);
        for y in 0..8 {
            for x in 0..8 {
                assert!((kernel.weight(x, y) - kernel.weight(7 - x, 7 - y)).abs() < 1e-6);
                assert!((kernel.weight(x, y) - kernel.weight(y, x)).abs() < 1e-6);
            }
        }
    }

    #[test]
    #[should_panic(expected = "unsupported sharpening kernel size")]
    fn test_odd_size_is_rejected() {
        SeparableKernel2D::with_sharpening(5, 0.5);
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_lookup_panics() {
        SeparableKernel2D::with_sharpening(4, 0.0).weight(4, 0);
    }
}
