//! # polytess
//!
//! `polytess` computes Voronoi tessellations in 2D and 3D, either serially or distributed
//! over domains that each own a subset of the generators.
//!
//! ## Features
//!
//! - **One interface**: serial and distributed tessellators implement [`Tessellator`], and
//!   callers ask [`Tessellator::handles_plcs`] before requesting a PLC bounded tessellation.
//! - **Clipping kernel**: cells start as the region box and are clipped by bisectors of
//!   nearby generators found through a uniform grid, in parallel with `rayon`.
//! - **Distributed domains**: [`DistributedTessellator`] exchanges ghost generators over a
//!   [`Communicator`] so each domain gets exactly the cells a serial run would give it.
//! - **Boundaries**: default padded regions, explicit boxes, or [`Plc`]s (convex in 3D, any
//!   shape with holes in 2D).
//!
//! ## Main Interface
//!
//! Start with [`SerialTessellator2d`] or [`SerialTessellator3d`]. For several domains,
//! wrap one in a [`DistributedTessellator`] per domain; [`run_domains`] runs an in-process
//! world on scoped threads.

pub mod algorithm;
mod bounds;
pub mod cell;
pub mod comm;
pub mod degeneracy;
pub mod distributed;
mod error;
mod generator;
pub mod kernel;
mod plc;
mod relax;
mod serial;
mod tessellator;
pub mod wall;

pub use bounds::{BoundingBox, REGION_PADDING, box_side};
pub use cell::{Cell, Cell2D, Cell3D, Facet};
pub use comm::{Communicator, LocalCommunicator, Tag, run_domains};
pub use distributed::{
    CommunicationInfo, DistributedOptions, DistributedTessellator, DomainTessellation, Packet, SerialBackend, SharedFace,
};
pub use error::{CommunicationError, Result, TessellationError};
pub use generator::Generator;
pub use kernel::{BoxKernel, ClipKernel, DEFAULT_DEGENERACY, GeometricKernel, VoronoiKernel2d, VoronoiKernel3d};
pub use plc::Plc;
pub use relax::{relax, relax_in_box, relax_with_plc};
pub use serial::{BoxTessellator2d, BoxTessellator3d, SerialTessellator, SerialTessellator2d, SerialTessellator3d};
pub use tessellator::Tessellator;
pub use wall::{WALL_ID_MAX, plc_facet_id, plc_facet_index};
