pub mod application;
pub mod branch;
pub mod myid;
pub mod product;
pub mod user;

pub use application::ApplicationRepository;
pub use branch::BranchRepository;
pub use myid::MyIdRepository;
pub use product::ProductRepository;
pub use user::UserRepository;
