mod smiles;
pub use smiles::*;

mod notation;
pub use notation::*;
