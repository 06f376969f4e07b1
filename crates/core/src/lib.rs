//! Haar cascade face detection on video frames.
//!
//! `shared` holds the value types, `imaging` the pixel operations, and each
//! of `detection` and `video` is split into a domain layer of traits and an
//! infrastructure layer that implements them. `pipeline` ties them together.

pub mod shared {
    pub mod constants;
    pub mod frame;
    pub mod math;
    pub mod model_resolver;
    pub mod region;
    pub mod video_metadata;
}

pub mod imaging {
    pub mod annotate;
    pub mod gray_image;
    pub mod integral_image;
}

pub mod detection {
    pub mod domain {
        pub mod detection;
        pub mod detection_params;
        pub mod face_detector;
        pub mod partition;
        pub mod rect_grouper;
    }
    pub mod infrastructure;
}

pub mod video {
    pub mod domain {
        pub mod image_writer;
        pub mod video_reader;
    }
    pub mod infrastructure;
}

pub mod analysis {
    pub mod comparison;
    pub mod face_series;
    pub mod series_file;
    pub mod signal;
}

pub mod pipeline {
    pub mod detect_faces_use_case;
    pub mod pipeline_logger;
}
