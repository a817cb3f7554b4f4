pub mod shared {
    pub mod bounding_box;
    pub mod constants;
    pub mod frame;
    pub mod pipeline_logger;
    pub mod video_metadata;
}

pub mod detection {
    pub mod domain {
        pub mod face_detector;
        pub mod face_landmarks;
        pub mod landmark_predictor;
    }
    pub mod infrastructure;
}

pub mod tracking {
    pub mod domain {
        pub mod detection_schedule;
        pub mod face_crop;
        pub mod face_tracker;
        pub mod track;
        pub mod track_assigner;
        pub mod track_error;
        pub mod tracker_config;
        pub mod tracker_state;
    }
}

pub mod video {
    pub mod domain {
        pub mod box_overlay;
        pub mod video_reader;
        pub mod video_writer;
    }
    pub mod infrastructure {
        pub mod ffmpeg_reader;
        pub mod ffmpeg_writer;
    }
}

pub mod clip {
    pub mod domain {
        pub mod clip_window;
    }
}

pub mod dataset {
    pub mod domain {
        pub mod dataset_error;
        pub mod dataset_layout;
    }
    pub mod infrastructure {
        pub mod artifact_writer;
    }
}

pub mod pipeline {
    pub mod batch_executor;
    pub mod build_clip_use_case;
    pub mod infrastructure {
        pub mod threaded_batch_executor;
    }
}
