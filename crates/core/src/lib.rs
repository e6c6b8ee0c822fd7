//! Face detection and facial expression classification.
//!
//! A still image goes through [`pipeline::predict_emotion_use_case`]:
//! decode, grayscale, Haar-cascade face search, crop to a 48x48 patch and
//! classification into seven expressions.

pub mod classification {
    pub mod domain {
        pub mod emotion;
        pub mod emotion_classifier;
        pub mod emotion_distribution;
    }
    pub mod infrastructure;
}

pub mod codec {
    pub mod image_decoder;
}

pub mod detection {
    pub mod domain {
        pub mod face_detector;
        pub mod selection_policy;
    }
    pub mod infrastructure;
}

pub mod normalization {
    pub mod face_patch;
    pub mod region_normalizer;
}

pub mod pipeline {
    pub mod model_context;
    pub mod predict_emotion_use_case;
}

pub mod shared {
    pub mod bounding_box;
    pub mod constants;
    pub mod model_resolver;
    pub mod raster_image;
}
