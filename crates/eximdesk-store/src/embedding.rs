//! uint8 quantization for stored embedding vectors.

use ndarray::Array1;

/// A float32 vector quantized to uint8 with a linear scale/offset.
///
/// Maps [min, max] → [0, 255]; original ≈ byte * scale + offset.
#[derive(Debug, Clone)]
pub struct QuantizedVec {
    pub bytes: Vec<u8>,
    pub scale: f32,
    pub offset: f32,
}

impl QuantizedVec {
    pub fn encode(vector: &Array1<f32>) -> Self {
        let min_val = vector.iter().copied().fold(f32::INFINITY, f32::min);
        let max_val = vector.iter().copied().fold(f32::NEG_INFINITY, f32::max);

        let range = max_val - min_val;
        if range < 1e-9 {
            // Constant vector quantizes to all zeros.
            return Self {
                bytes: vec![0u8; vector.len()],
                scale: 0.0,
                offset: min_val,
            };
        }

        let scale = range / 255.0;
        let offset = min_val;
        let bytes = vector
            .iter()
            .map(|&v| ((v - offset) / scale).round().clamp(0.0, 255.0) as u8)
            .collect();

        Self { bytes, scale, offset }
    }

    pub fn decode(&self) -> Array1<f32> {
        Array1::from_iter(self.bytes.iter().map(|&b| b as f32 * self.scale + self.offset))
    }
}
