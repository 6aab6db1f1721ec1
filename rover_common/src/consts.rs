//! System-wide constants for the rover workspace.
//!
//! Single source of truth for the rig's default pin map, timing and input
//! scaling. Configuration defaults are built from these values.

// ─── GPIO ───────────────────────────────────────────────────────────

/// GPIO chip exposing the 40-pin header on a Raspberry Pi 5.
pub const DEFAULT_GPIO_CHIP: u32 = 4;

/// Activity LED line, pulsed whenever any axis steps.
pub const DEFAULT_ACTIVITY_LED: u32 = 18;

/// Left drive motor: (enable, direction, pulse).
pub const MOTOR_LEFT_PINS: (u32, u32, u32) = (6, 5, 13);

/// Right drive motor: (enable, direction, pulse).
pub const MOTOR_RIGHT_PINS: (u32, u32, u32) = (19, 26, 21);

/// Turret pan motor: (enable, direction, pulse).
pub const MOTOR_PAN_PINS: (u32, u32, u32) = (23, 24, 25);

/// Turret tilt motor: (enable, direction, pulse).
pub const MOTOR_TILT_PINS: (u32, u32, u32) = (12, 16, 20);

// ─── Joystick ───────────────────────────────────────────────────────

/// Number of slots in the fused input axis vector.
pub const INPUT_AXIS_SLOTS: usize = 8;

/// Left stick X axis index.
pub const JOYSTICK_AXIS_X: usize = 0;

/// Left stick Y axis index.
pub const JOYSTICK_AXIS_Y: usize = 1;

/// Right stick X axis index.
pub const JOYSTICK_AXIS_RX: usize = 3;

/// Right stick Y axis index.
pub const JOYSTICK_AXIS_RY: usize = 4;

/// The four axis slots the rig consumes.
pub const SUPPORTED_AXES: [usize; 4] = [
    JOYSTICK_AXIS_X,
    JOYSTICK_AXIS_Y,
    JOYSTICK_AXIS_RX,
    JOYSTICK_AXIS_RY,
];

/// Signed 16-bit joystick axis max.
pub const MAX_JOYSTICK_VALUE: i32 = 32767;

/// Deadzone applied to scaled commands in the [-512, 512] domain.
pub const JOYSTICK_DEADZONE: i32 = 25;

/// Bound of the scaled command domain.
pub const COMMAND_RANGE: i32 = 512;

/// Default joystick character device.
pub const DEFAULT_JOYSTICK_PATH: &str = "/dev/input/js0";

// ─── Network ────────────────────────────────────────────────────────

/// UDP control port.
pub const UDP_PORT: u16 = 5005;

/// Maximum accepted datagram size in bytes.
pub const UDP_BUFFER_SIZE: usize = 4096;

/// Network silence after which the inputs are reset to neutral.
pub const NETWORK_TIMEOUT_MS: u64 = 1000;

// ─── Timing & Speed ─────────────────────────────────────────────────

/// Full-scale axis speed in steps per second.
pub const MAX_SPEED_STEPS_PER_SEC: i16 = 100;

/// Active pulse width in microseconds.
pub const PULSE_WIDTH_US: u32 = 20;

/// On-time of the activity LED after a step.
pub const STEP_LED_DURATION_MS: u64 = 50;

/// Control loop polling cadence.
pub const CONTROL_POLL_MS: u64 = 5;

/// Status line cadence.
pub const LOG_INTERVAL_MS: u64 = 1000;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/rover/rover.toml";
