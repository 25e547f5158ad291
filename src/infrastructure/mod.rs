pub mod cluster;

pub use cluster::{JobApi, KubeJobApi};
