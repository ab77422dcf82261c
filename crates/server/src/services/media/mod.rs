pub mod cloudinary;

pub use cloudinary::{CloudinaryClient, DynMediaStorage, MediaStorageTrait};
