// src/vehicle_classes.rs

/// The four vehicle classes this system counts, keyed by COCO class id.
/// Everything outside this registry is not a vehicle for counting purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VehicleClass {
    Bicycle,
    Car,
    Motorcycle,
    Truck,
}

impl VehicleClass {
    /// Display order for the count overlay.
    pub const ALL: [VehicleClass; 4] = [
        VehicleClass::Car,
        VehicleClass::Bicycle,
        VehicleClass::Motorcycle,
        VehicleClass::Truck,
    ];

    /// Registry lookup. Returns `None` for any class id outside the four
    /// configured vehicle classes.
    pub fn from_class_id(class_id: u32) -> Option<Self> {
        match class_id {
            1 => Some(VehicleClass::Bicycle),
            2 => Some(VehicleClass::Car),
            3 => Some(VehicleClass::Motorcycle),
            7 => Some(VehicleClass::Truck),
            _ => None,
        }
    }

    pub fn class_id(&self) -> u32 {
        match self {
            VehicleClass::Bicycle => 1,
            VehicleClass::Car => 2,
            VehicleClass::Motorcycle => 3,
            VehicleClass::Truck => 7,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VehicleClass::Bicycle => "bicycle",
            VehicleClass::Car => "car",
            VehicleClass::Motorcycle => "motorcycle",
            VehicleClass::Truck => "truck",
        }
    }

    /// Capitalized label for the count overlay rows.
    pub fn display_name(&self) -> &'static str {
        match self {
            VehicleClass::Bicycle => "Bicycle",
            VehicleClass::Car => "Car",
            VehicleClass::Motorcycle => "Motorcycle",
            VehicleClass::Truck => "Truck",
        }
    }
}
