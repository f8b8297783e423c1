pub mod layout;
pub mod pad;
pub mod pixel_math;
