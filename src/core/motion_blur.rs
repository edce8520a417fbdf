use crate::types::{CanonicalImage, Sample};
use ndarray::{ArrayView2, ArrayViewMut2, Zip};

/// Horizontal motion blur with a 1 x `kernel_size` box kernel.
///
/// Each band is convolved independently; borders reflect without repeating
/// the edge sample (`dcb|abcd|cba`). Even kernel sizes are widened to the
/// next odd size so the kernel stays centred.
pub fn motion_blur(image: &CanonicalImage, kernel_size: usize) -> CanonicalImage {
    let kernel_size = kernel_size.max(1) | 1;
    let mut blurred = image.derive(image.data.clone());

    #[cfg(feature = "parallel")]
    log::debug!(
        "Motion blur kernel {} over {} bands on {} threads",
        kernel_size,
        image.bands(),
        rayon::current_num_threads()
    );

    #[cfg(feature = "parallel")]
    Zip::from(blurred.data.outer_iter_mut())
        .and(image.data.outer_iter())
        .par_for_each(|dst, src| blur_band(src, dst, kernel_size));

    #[cfg(not(feature = "parallel"))]
    Zip::from(blurred.data.outer_iter_mut())
        .and(image.data.outer_iter())
        .for_each(|dst, src| blur_band(src, dst, kernel_size));

    blurred.clip_to_range();
    blurred
}

fn blur_band(src: ArrayView2<Sample>, mut dst: ArrayViewMut2<Sample>, kernel_size: usize) {
    let half = (kernel_size / 2) as isize;
    let width = src.ncols();
    let weight = 1.0 / kernel_size as Sample;

    for (src_row, mut dst_row) in src.rows().into_iter().zip(dst.rows_mut()) {
        for (j, out) in dst_row.iter_mut().enumerate() {
            let sum: Sample = (-half..=half)
                .map(|offset| src_row[reflect_101(j as isize + offset, width)])
                .sum();
            *out = sum * weight;
        }
    }
}

/// Mirror an out-of-range index back into `0..len` without repeating the edge
pub(crate) fn reflect_101(index: isize, len: usize) -> usize {
    if len <= 1 {
        return 0;
    }
    let period = 2 * (len as isize - 1);
    let folded = index.rem_euclid(period);
    if folded >= len as isize {
        (period - folded) as usize
    } else {
        folded as usize
    }
}
