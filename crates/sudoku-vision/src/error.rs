use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Classifier(#[from] sudoku_vision_classifier::ClassifierError),

    #[error("frame {width}x{height} is too small to search for a grid")]
    FrameTooSmall { width: usize, height: usize },
}
