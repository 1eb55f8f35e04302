//! Module interfaces
//!
//! Each cyclic module in `drive_ctrl` shall implement [`State`], and every
//! module that produces actuator demands shall also implement [`Stop`].

// ---------------------------------------------------------------------------
// MODULE STATE
// ---------------------------------------------------------------------------

/// The module's internal state.
pub trait State: Sized {
    /// Data required during initialisation
    type InitData;
    /// An error which can occur during initialisation.
    type InitError;

    /// Data required for cyclic processing.
    type InputData;
    /// Data produced by cyclic processing.
    type OutputData;
    /// A report on the status of the cyclic processing.
    type StatusReport;
    /// An error which can occur during cyclic processing.
    type ProcError;

    /// Initialise the module.
    ///
    /// # Inputs
    /// - `init_data`: The input data required by the module.
    ///
    /// # Outputs
    /// - On success the initialised module.
    /// - On error an `InitError` instance.
    fn init(init_data: Self::InitData) -> Result<Self, Self::InitError>;

    /// Main module processing function.
    ///
    /// # Inputs
    /// - `input_data`: The data required for processing by the module.
    ///
    /// # Outputs
    /// - On success a tuple of the output data and status report.
    /// - On error a `ProcError` instance.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>;
}

// ---------------------------------------------------------------------------
// MODULE STOP
// ---------------------------------------------------------------------------

/// A module which can be brought to a neutral state.
pub trait Stop: State {
    /// Stop the module, returning the neutral output that the caller shall
    /// send to the actuators.
    ///
    /// Calling `stop` on an already stopped module shall have no further
    /// effect and return the same neutral output.
    fn stop(&mut self) -> Self::OutputData;
}
