mod product;

pub use product::{base_filename, image_path, Product, ProductChanges};
