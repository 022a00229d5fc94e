//! Module interfaces
//!
//! Every cyclic module of the tracking executable implements [`State`]. The
//! exec initialises each module once from its parameter file, then calls
//! `proc` once per tick. If the exec loses the ability to act on a module's
//! output it calls `make_safe`, after which the module must produce no
//! motion until it is commanded again.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// MODULE STATE
// ---------------------------------------------------------------------------

/// The module's internal state.
pub trait State {
    /// Data needed by `init`, usually the parameter file name.
    type InitData;
    /// Failure to initialise.
    type InitError;

    /// Inputs gathered by the exec each tick.
    type InputData;
    /// Outputs for the exec to act on.
    type OutputData;
    /// What happened during the tick, for logging and telemetry.
    type StatusReport;
    /// Failure during a tick.
    type ProcError;

    /// Initialise the module, replacing any previous state.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>;

    /// Process one tick.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>;

    /// Stop anything in progress and hold with no output.
    fn make_safe(&mut self);
}
