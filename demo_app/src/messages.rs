//! Messages broadcast by the demo

use gameobjects::game_message;

game_message! {
    /// One simulation step
    pub struct SimulationUpdate {
        /// Step length in seconds
        pub dt: f32,
        /// Index of the step
        pub frame: u32,
    }
}
