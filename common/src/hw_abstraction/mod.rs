use crate::errors::{DeviceError, ReportError};
use crate::types::measurements::Imu9DofData;

/// A source of inertial measurements. Every getter returns the most recent
/// reading as an owned copy, so implementors are free to sample on their own
/// thread or interrupt.
#[allow(async_fn_in_trait)]
pub trait ImuSource {
    /// Acceleration including gravity, in `g`
    async fn get_accel(&mut self) -> Result<[f32; 3], DeviceError>;

    /// Angular rate, in `deg/s`
    async fn get_gyro(&mut self) -> Result<[f32; 3], DeviceError>;

    /// Magnetic field, in `uT`
    async fn get_mag(&mut self) -> Result<[f32; 3], DeviceError>;

    async fn read_acc_gyr_mag(&mut self) -> Result<Imu9DofData<f32>, DeviceError> {
        Ok(Imu9DofData {
            acc: self.get_accel().await?,
            gyr: self.get_gyro().await?,
            mag: self.get_mag().await?,
        })
    }
}

impl<S: ImuSource> ImuSource for &mut S {
    async fn get_accel(&mut self) -> Result<[f32; 3], DeviceError> {
        (**self).get_accel().await
    }

    async fn get_gyro(&mut self) -> Result<[f32; 3], DeviceError> {
        (**self).get_gyro().await
    }

    async fn get_mag(&mut self) -> Result<[f32; 3], DeviceError> {
        (**self).get_mag().await
    }

    async fn read_acc_gyr_mag(&mut self) -> Result<Imu9DofData<f32>, DeviceError> {
        (**self).read_acc_gyr_mag().await
    }
}

/// The radio beacon relaying the flight status.
#[allow(async_fn_in_trait)]
pub trait StatusSink {
    /// Replace the message currently being broadcast
    async fn update_message(&mut self, message: &str) -> Result<(), ReportError>;
}

impl<S: StatusSink> StatusSink for &mut S {
    async fn update_message(&mut self, message: &str) -> Result<(), ReportError> {
        (**self).update_message(message).await
    }
}
