use std::collections::HashSet;

use crate::bounds::BoundingBox;
use crate::degeneracy::find_degenerate_pair;
use crate::error::{Result, TessellationError};
use crate::generator::Generator;
use crate::kernel::{BoxKernel, GeometricKernel, VoronoiKernel2d, VoronoiKernel3d};
use crate::plc::Plc;
use crate::tessellator::Tessellator;

/// Tessellates all generators in-process with a geometric kernel.
///
/// Inputs are validated before they reach the kernel: generator ids must be unique and
/// coordinates finite, boxes must have an interior and PLCs must be well formed.
#[derive(Clone, Debug, Default)]
pub struct SerialTessellator<K> {
    kernel: K,
}

pub type SerialTessellator2d = SerialTessellator<VoronoiKernel2d>;
pub type SerialTessellator3d = SerialTessellator<VoronoiKernel3d>;
pub type BoxTessellator2d = SerialTessellator<BoxKernel<VoronoiKernel2d>>;
pub type BoxTessellator3d = SerialTessellator<BoxKernel<VoronoiKernel3d>>;

impl<K> SerialTessellator<K> {
    pub fn new(kernel: K) -> Self {
        Self { kernel }
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }
}

/// Rejects duplicate ids and non-finite coordinates.
pub(crate) fn validate_generators<const D: usize>(generators: &[Generator<D>]) -> Result<()> {
    let mut seen = HashSet::with_capacity(generators.len());
    for g in generators {
        if g.position.iter().any(|c| !c.is_finite()) {
            return Err(TessellationError::InvalidGenerator {
                id: g.id,
                reason: format!("non-finite position {:?}", g.position),
            });
        }
        if !seen.insert(g.id) {
            return Err(TessellationError::DuplicateGeneratorId { id: g.id });
        }
    }
    Ok(())
}

pub(crate) fn validate_bounds<const D: usize>(bounds: &BoundingBox<D>) -> Result<()> {
    if bounds.is_valid() {
        Ok(())
    } else {
        Err(TessellationError::InvalidBounds(format!("{bounds:?} has no interior")))
    }
}

/// Rejects generators closer than the degeneracy of the region apart.
pub(crate) fn check_degeneracy<const D: usize>(
    generators: &[Generator<D>],
    region: &BoundingBox<D>,
    degeneracy: f64,
) -> Result<()> {
    match find_degenerate_pair(generators, region, degeneracy) {
        Some((first, second)) => Err(TessellationError::DegenerateGenerators { first, second }),
        None => Ok(()),
    }
}

/// The PLC bounds, once the PLC itself has been validated.
pub(crate) fn plc_region<const D: usize>(plc: &Plc<D>) -> Result<BoundingBox<D>> {
    plc.validate()?;
    plc.bounds().ok_or_else(|| TessellationError::InvalidPlc("the PLC has no points".into()))
}

impl<const D: usize, K: GeometricKernel<D>> Tessellator<D> for SerialTessellator<K> {
    type Cell = K::Cell;

    fn handles_plcs(&self) -> bool {
        self.kernel.accepts_plc()
    }

    fn name(&self) -> String {
        self.kernel.name()
    }

    fn degeneracy(&self) -> f64 {
        self.kernel.precision()
    }

    fn tessellate(&self, generators: &[Generator<D>]) -> Result<Vec<K::Cell>> {
        validate_generators(generators)?;
        match Generator::bounds(generators) {
            Some(bounds) => {
                let region = bounds.padded_region();
                check_degeneracy(generators, &region, self.degeneracy())?;
                self.kernel.compute(generators, &region, None)
            }
            None => Ok(Vec::new()),
        }
    }

    fn tessellate_in_box(&self, generators: &[Generator<D>], bounds: &BoundingBox<D>) -> Result<Vec<K::Cell>> {
        validate_bounds(bounds)?;
        validate_generators(generators)?;
        if generators.is_empty() {
            return Ok(Vec::new());
        }
        check_degeneracy(generators, bounds, self.degeneracy())?;
        self.kernel.compute(generators, bounds, None)
    }

    fn tessellate_with_plc(&self, generators: &[Generator<D>], plc: &Plc<D>) -> Result<Vec<K::Cell>> {
        if !self.handles_plcs() {
            return Err(TessellationError::UnsupportedPlc { tessellator: self.name() });
        }
        let region = plc_region(plc)?;
        validate_generators(generators)?;
        if generators.is_empty() {
            return Ok(Vec::new());
        }
        check_degeneracy(generators, &region, self.degeneracy())?;
        self.kernel.compute(generators, &region, Some(plc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;

    #[test]
    fn test_capabilities() {
        let serial = SerialTessellator2d::default();
        assert!(serial.handles_plcs());
        assert_eq!(serial.name(), "ClipKernel2d");
        assert_eq!(serial.degeneracy(), crate::kernel::DEFAULT_DEGENERACY);

        let boxed = BoxTessellator3d::default();
        assert!(!boxed.handles_plcs());
        assert_eq!(boxed.name(), "BoxClipKernel3d");
    }

    #[test]
    fn test_empty_input() {
        let serial = SerialTessellator3d::default();
        assert!(serial.tessellate(&[]).unwrap().is_empty());
        let bounds = BoundingBox::new([0.0; 3], [1.0; 3]);
        assert!(serial.tessellate_in_box(&[], &bounds).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_bad_generators() {
        let serial = SerialTessellator2d::default();
        let duplicate = vec![Generator::new(1, [0.0, 0.0]), Generator::new(1, [1.0, 1.0])];
        assert_eq!(serial.tessellate(&duplicate).unwrap_err(), TessellationError::DuplicateGeneratorId { id: 1 });

        let nan = vec![Generator::new(4, [f64::NAN, 0.0])];
        assert!(matches!(serial.tessellate(&nan), Err(TessellationError::InvalidGenerator { id: 4, .. })));

        let flat = BoundingBox::new([0.0, 0.0], [1.0, 0.0]);
        assert!(matches!(
            serial.tessellate_in_box(&[Generator::new(0, [0.5, 0.0])], &flat),
            Err(TessellationError::InvalidBounds(_))
        ));
    }

    #[test]
    fn test_rejects_coincident_generators() {
        let serial = SerialTessellator2d::default();
        let generators = vec![Generator::new(0, [0.0, 0.0]), Generator::new(1, [1.0, 1.0]), Generator::new(2, [1.0, 1.0 + 1e-12])];
        assert_eq!(
            serial.tessellate(&generators).unwrap_err(),
            TessellationError::DegenerateGenerators { first: 1, second: 2 }
        );
    }

    #[test]
    fn test_close_generators_beyond_degeneracy_get_cells() {
        let serial = SerialTessellator2d::default();
        let bounds = BoundingBox::new([0.0, 0.0], [1.0, 1.0]);
        let generators = vec![
            Generator::new(0, [0.5, 0.5]),
            Generator::new(1, [0.5 + 0.8e-8, 0.5 + 0.8e-8]),
            Generator::new(2, [0.1, 0.1]),
        ];
        let cells = serial.tessellate_in_box(&generators, &bounds).unwrap();
        assert_eq!(cells.len(), 3);
        let total: f64 = cells.iter().map(|c| c.measure()).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_unsupported_plc_is_reported_before_validation() {
        let boxed = BoxTessellator2d::default();
        let err = boxed.tessellate_with_plc(&[], &Plc::default()).unwrap_err();
        assert_eq!(err, TessellationError::UnsupportedPlc { tessellator: "BoxClipKernel2d".into() });
    }

    #[test]
    fn test_single_generator_fills_default_region() {
        let serial = SerialTessellator3d::default();
        let cells = serial.tessellate(&[Generator::new(7, [1.0, 2.0, 3.0])]).unwrap();
        assert_eq!(cells.len(), 1);
        assert!((cells[0].measure() - 8.0).abs() < 1e-9);
        assert!(cells[0].neighbors().iter().all(|&n| n < 0));
    }
}
