use crate::bounds::BoundingBox;
use crate::cell::Cell;
use crate::error::{Result, TessellationError};
use crate::generator::Generator;
use crate::plc::Plc;

/// Common interface of serial and distributed tessellators.
///
/// Callers query [`handles_plcs`](Self::handles_plcs) before asking for a PLC bounded
/// tessellation; tessellators without PLC support fail such requests with
/// [`TessellationError::UnsupportedPlc`].
pub trait Tessellator<const D: usize> {
    type Cell: Cell<D>;

    /// Whether [`tessellate_with_plc`](Self::tessellate_with_plc) is supported.
    fn handles_plcs(&self) -> bool;

    fn name(&self) -> String;

    /// Relative distance below which generators are treated as coincident.
    fn degeneracy(&self) -> f64;

    /// Cells for `generators` in the default region: the generator bounds padded by
    /// [`REGION_PADDING`](crate::bounds::REGION_PADDING) of their largest extent.
    fn tessellate(&self, generators: &[Generator<D>]) -> Result<Vec<Self::Cell>>;

    /// Cells for `generators` clipped to `bounds`.
    fn tessellate_in_box(&self, generators: &[Generator<D>], bounds: &BoundingBox<D>) -> Result<Vec<Self::Cell>>;

    /// Cells for `generators` clipped to the region enclosed by `plc`.
    fn tessellate_with_plc(&self, _generators: &[Generator<D>], _plc: &Plc<D>) -> Result<Vec<Self::Cell>> {
        Err(TessellationError::UnsupportedPlc { tessellator: self.name() })
    }
}
