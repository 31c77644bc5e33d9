use num_complex::Complex;

/// Direction of the transform performed by [`fft_in_place`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Inverse,
}

/// In-place iterative radix-2 decimation-in-time FFT.
///
/// The buffer length must be a power of two; the caller owns the working
/// buffer and guarantees the size, so this is a contract and not a runtime
/// condition. The inverse transform scales every output by 1/N so a
/// forward/inverse pair reproduces the input.
pub fn fft_in_place(buffer: &mut [Complex<f32>], direction: Direction) {
    let n = buffer.len();
    debug_assert!(n.is_power_of_two(), "transform size must be a power of two");
    if n < 2 {
        return;
    }

    bit_reverse_permute(buffer);

    let sign = match direction {
        Direction::Forward => -1.0f32,
        Direction::Inverse => 1.0f32,
    };

    // Butterfly passes for stage lengths 2, 4, 8, ..., n. Each stage computes
    // one sine/cosine pair; the twiddle factor then advances by a complex
    // rotation per butterfly instead of fresh trigonometric calls.
    let mut len = 2;
    while len <= n {
        let angle = sign * 2.0 * std::f32::consts::PI / len as f32;
        let rotation = Complex::new(angle.cos(), angle.sin());
        let half = len / 2;

        for start in (0..n).step_by(len) {
            let mut twiddle = Complex::new(1.0f32, 0.0);
            for k in start..start + half {
                let even = buffer[k];
                let odd = buffer[k + half] * twiddle;
                buffer[k] = even + odd;
                buffer[k + half] = even - odd;
                twiddle *= rotation;
            }
        }

        len <<= 1;
    }

    if direction == Direction::Inverse {
        let scale = 1.0 / n as f32;
        for value in buffer.iter_mut() {
            *value *= scale;
        }
    }
}

/// Reorder the buffer so each element sits at the bit-reversed image of its
/// index, the input ordering the iterative butterfly passes expect.
fn bit_reverse_permute(buffer: &mut [Complex<f32>]) {
    let n = buffer.len();
    let bits = n.trailing_zeros();
    for i in 0..n {
        let j = i.reverse_bits() >> (usize::BITS - bits);
        if i < j {
            buffer.swap(i, j);
        }
    }
}
