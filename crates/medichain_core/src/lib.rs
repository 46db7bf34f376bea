pub mod domain;
pub mod ports;

pub use domain::{NewUser, Role, RoleProfile, UnknownRole, UserCredentials, UserIdentity, UserRecord};
pub use ports::{PortError, PortResult, UserStore, UserStores};
