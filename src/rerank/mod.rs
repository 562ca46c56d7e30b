pub mod pongo;

pub use pongo::PongoReranker;
