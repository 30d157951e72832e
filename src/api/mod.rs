mod impls;
mod market;
mod requests;
mod responses;

pub use impls::*;
pub use market::*;
pub use requests::*;
pub use responses::*;
