pub mod compute;
pub mod constants;
pub mod normalize;
pub mod reference;
