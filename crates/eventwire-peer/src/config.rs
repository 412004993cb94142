use eventwire_frame::FrameConfig;

/// Permissions applied to Unix socket files created by `Consumer::listen`.
pub const DEFAULT_SOCKET_MODE: u32 = 0o600;

/// Provider behavior configuration.
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    /// Frame limits and socket timeouts for the outbound connection.
    pub frame: FrameConfig,
}

impl ProviderConfig {
    pub fn with_frame_config(mut self, frame: FrameConfig) -> Self {
        self.frame = frame;
        self
    }

    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.frame.max_frame_size = max_frame_size;
        self
    }
}

/// Consumer behavior configuration.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Frame limits and socket timeouts applied to every accepted connection.
    pub frame: FrameConfig,
    /// File mode for Unix socket files. Ignored for TCP.
    pub socket_mode: u32,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            socket_mode: DEFAULT_SOCKET_MODE,
        }
    }
}

impl ConsumerConfig {
    pub fn with_frame_config(mut self, frame: FrameConfig) -> Self {
        self.frame = frame;
        self
    }

    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.frame.max_frame_size = max_frame_size;
        self
    }

    pub fn with_socket_mode(mut self, mode: u32) -> Self {
        self.socket_mode = mode;
        self
    }
}
