

pub mod vector_space;

pub use vector_space::VectorSpaceModel;
