use crate::prelude::{ProcessError, ProcessResult};

/// The independent validity layers written by the filter engine.
///
/// For GPS sources the `Difference` layer carries the differential-quality
/// filter, `Vertical` carries the altitude filter, and `Beam` carries the
/// HDOP filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidityLayer {
    Raw,
    Difference,
    Vertical,
    Smooth,
    Beam,
}

/// Named per-ensemble validity rows plus the derived composite row.
///
/// The composite is never written directly; it is recomputed as the logical
/// AND of the other layers every time one of them changes.
#[derive(Debug, Clone)]
pub struct ValidityLayers {
    composite: Vec<bool>,
    raw: Vec<bool>,
    difference: Vec<bool>,
    vertical: Vec<bool>,
    smooth: Vec<bool>,
    beam: Vec<bool>,
}

impl ValidityLayers {
    /// All layers start true for `len` ensembles.
    pub fn new(len: usize) -> Self {
        Self {
            composite: vec![true; len],
            raw: vec![true; len],
            difference: vec![true; len],
            vertical: vec![true; len],
            smooth: vec![true; len],
            beam: vec![true; len],
        }
    }

    pub fn len(&self) -> usize {
        self.composite.len()
    }

    pub fn is_empty(&self) -> bool {
        self.composite.is_empty()
    }

    pub fn composite(&self) -> &[bool] {
        &self.composite
    }

    pub fn is_valid(&self, ensemble: usize) -> bool {
        self.composite.get(ensemble).copied().unwrap_or(false)
    }

    pub fn layer(&self, layer: ValidityLayer) -> &[bool] {
        match layer {
            ValidityLayer::Raw => &self.raw,
            ValidityLayer::Difference => &self.difference,
            ValidityLayer::Vertical => &self.vertical,
            ValidityLayer::Smooth => &self.smooth,
            ValidityLayer::Beam => &self.beam,
        }
    }

    /// Replace one layer and recompute the composite.
    pub fn set_layer(&mut self, layer: ValidityLayer, values: Vec<bool>) -> ProcessResult<()> {
        if values.len() != self.len() {
            return Err(ProcessError::DimensionMismatch {
                expected: self.len(),
                actual: values.len(),
            });
        }
        match layer {
            ValidityLayer::Raw => self.raw = values,
            ValidityLayer::Difference => self.difference = values,
            ValidityLayer::Vertical => self.vertical = values,
            ValidityLayer::Smooth => self.smooth = values,
            ValidityLayer::Beam => self.beam = values,
        }
        self.recompute_composite();
        Ok(())
    }

    /// Force one layer entirely true (a filter switched off).
    pub fn clear_layer(&mut self, layer: ValidityLayer) {
        let len = self.len();
        // Length always matches, so the error arm is unreachable.
        let _ = self.set_layer(layer, vec![true; len]);
    }

    pub fn invalid_count(&self) -> usize {
        self.composite.iter().filter(|v| !**v).count()
    }

    fn recompute_composite(&mut self) {
        for i in 0..self.composite.len() {
            self.composite[i] = self.raw[i]
                && self.difference[i]
                && self.vertical[i]
                && self.smooth[i]
                && self.beam[i];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_is_and_of_all_layers() {
        let mut layers = ValidityLayers::new(4);
        layers
            .set_layer(ValidityLayer::Difference, vec![true, false, true, true])
            .unwrap();
        layers
            .set_layer(ValidityLayer::Beam, vec![true, true, false, true])
            .unwrap();
        assert_eq!(layers.composite(), &[true, false, false, true]);

        // Every mutation keeps the invariant.
        for layer in [
            ValidityLayer::Raw,
            ValidityLayer::Difference,
            ValidityLayer::Vertical,
            ValidityLayer::Smooth,
            ValidityLayer::Beam,
        ] {
            for i in 0..4 {
                let expected = layers.layer(ValidityLayer::Raw)[i]
                    && layers.layer(ValidityLayer::Difference)[i]
                    && layers.layer(ValidityLayer::Vertical)[i]
                    && layers.layer(ValidityLayer::Smooth)[i]
                    && layers.layer(layer)[i]
                    && layers.layer(ValidityLayer::Beam)[i];
                assert_eq!(layers.composite()[i], expected);
            }
        }
    }

    #[test]
    fn clearing_a_layer_restores_validity() {
        let mut layers = ValidityLayers::new(3);
        layers
            .set_layer(ValidityLayer::Smooth, vec![false, false, false])
            .unwrap();
        assert_eq!(layers.invalid_count(), 3);
        layers.clear_layer(ValidityLayer::Smooth);
        assert_eq!(layers.invalid_count(), 0);
    }

    #[test]
    fn wrong_length_layer_is_rejected() {
        let mut layers = ValidityLayers::new(3);
        let err = layers.set_layer(ValidityLayer::Raw, vec![true]).unwrap_err();
        assert!(matches!(err, ProcessError::DimensionMismatch { .. }));
    }
}
