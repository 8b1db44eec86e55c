pub mod get_vehicle;
pub mod history;

pub use get_vehicle::{GetVehicleError, GetVehicleQuery};
pub use history::{
    GetVehicleHistoryError, GetVehicleHistoryQuery, VehicleChange, VehicleHistoryResponse,
};
