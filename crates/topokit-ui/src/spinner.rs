//! Loading Spinner
//!
//! Busy indicator shown while a page or asset is loading

/// Spinner size
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SpinnerSize {
    /// 20px
    Small,
    /// 40px
    #[default]
    Medium,
    /// 60px
    Large,
}

impl SpinnerSize {
    /// Edge length in pixels
    pub fn pixels(&self) -> u32 {
        match self {
            Self::Small => 20,
            Self::Medium => 40,
            Self::Large => 60,
        }
    }
}

/// Spinner color
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SpinnerColor {
    /// Blue
    #[default]
    Primary,
    /// Pink
    Secondary,
    /// White
    White,
}

impl SpinnerColor {
    /// CSS hex color
    pub fn hex(&self) -> &'static str {
        match self {
            Self::Primary => "#2196f3",
            Self::Secondary => "#f50057",
            Self::White => "#ffffff",
        }
    }
}

/// Loading spinner with a caption
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadingSpinner {
    /// Caption under the spinner
    pub text: String,
    /// Spinner size
    pub size: SpinnerSize,
    /// Spinner color
    pub color: SpinnerColor,
}

impl Default for LoadingSpinner {
    fn default() -> Self {
        Self {
            text: "Loading...".to_string(),
            size: SpinnerSize::default(),
            color: SpinnerColor::default(),
        }
    }
}

impl LoadingSpinner {
    /// Create a spinner with a custom caption
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Set size
    pub fn size(mut self, size: SpinnerSize) -> Self {
        self.size = size;
        self
    }

    /// Set color
    pub fn color(mut self, color: SpinnerColor) -> Self {
        self.color = color;
        self
    }

    /// Tooltip text
    pub fn title(&self) -> &'static str {
        "Loading, please wait..."
    }

    /// Render as a single line
    pub fn render(&self) -> String {
        format!("⟳ {}", self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let spinner = LoadingSpinner::default();
        assert_eq!(spinner.text, "Loading...");
        assert_eq!(spinner.size.pixels(), 40);
        assert_eq!(spinner.color.hex(), "#2196f3");
        assert_eq!(spinner.render(), "⟳ Loading...");
    }

    #[test]
    fn test_builder() {
        let spinner = LoadingSpinner::with_text("Loading model...")
            .size(SpinnerSize::Large)
            .color(SpinnerColor::White);
        assert_eq!(spinner.size.pixels(), 60);
        assert_eq!(spinner.color.hex(), "#ffffff");
        assert!(spinner.render().ends_with("Loading model..."));
    }
}
