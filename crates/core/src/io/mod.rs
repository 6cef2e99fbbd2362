//! Input loading for the four file kinds a solve run needs: adjacency,
//! region data, distance matrix, and the name table — plus JSON
//! snapshot persistence for resuming a solve later.

mod adjacency;
mod distances;
mod names;
mod regions;
mod snapshot;

pub use adjacency::read_adjacency;
pub use distances::read_or_build_distances;
pub use names::read_name_table;
pub use regions::read_region_data;
pub use snapshot::{read_snapshot, write_snapshot};
