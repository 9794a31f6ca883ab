pub mod convert;

pub mod hash;

pub mod measure;

pub mod substitutor;
