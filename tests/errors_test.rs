#[cfg(test)]
mod error_tests {
    use crabcast::errors::{PublishError, PublishErrorKind};
    use std::error::Error;

    #[test]
    fn test_disposed_display() {
        assert_eq!(PublishError::Disposed.to_string(), "track is disposed");
    }

    #[test]
    fn test_no_capture_device_display() {
        let error = PublishError::NoCaptureDevice("no camera attached".to_string());
        assert_eq!(error.to_string(), "No capture device available: no camera attached");
    }

    #[test]
    fn test_error_debug_format() {
        let error = PublishError::Sender("parameters rejected".to_string());
        let debug_str = format!("{:?}", error);
        assert!(debug_str.contains("Sender"));
        assert!(debug_str.contains("parameters rejected"));
    }

    #[test]
    fn test_error_implements_error_trait() {
        let error = PublishError::Close("helper refused".to_string());
        let _error_trait: &dyn Error = &error;
        assert!(error.source().is_none());
    }

    #[test]
    fn test_all_error_kinds() {
        let cases = vec![
            (PublishError::Disposed, PublishErrorKind::Disposed),
            (PublishError::NoCaptureDevice("a".into()), PublishErrorKind::NoCaptureDevice),
            (PublishError::Construction("b".into()), PublishErrorKind::Construction),
            (PublishError::Sender("c".into()), PublishErrorKind::Sender),
            (PublishError::AlreadyExists("d".into()), PublishErrorKind::AlreadyExists),
            (PublishError::Unsupported("e".into()), PublishErrorKind::Unsupported),
            (PublishError::Capture("f".into()), PublishErrorKind::Capture),
            (PublishError::Close("g".into()), PublishErrorKind::Close),
            (PublishError::Config("h".into()), PublishErrorKind::Config),
        ];
        for (error, kind) in cases {
            assert_eq!(error.kind(), kind);
            assert!(!error.to_string().is_empty());
        }
    }

    #[test]
    fn test_construction_failures() {
        assert!(PublishError::NoCaptureDevice("x".into()).is_construction_failure());
        assert!(PublishError::Construction("x".into()).is_construction_failure());
        assert!(!PublishError::Sender("x".into()).is_construction_failure());
        assert!(!PublishError::Disposed.is_construction_failure());
    }

    #[test]
    fn test_error_converts_to_anyhow() {
        fn fails() -> anyhow::Result<()> {
            Err(PublishError::AlreadyExists("simulcast track for codec h264".into()))?;
            Ok(())
        }
        let err = fails().unwrap_err();
        assert!(err.to_string().contains("h264"));
        assert!(err.downcast_ref::<PublishError>().is_some());
    }
}
