mod strategy;

pub use strategy::Strategy;
