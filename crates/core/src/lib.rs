pub mod annotation {
    pub mod annotate_image_use_case;
    pub mod frame_annotator;
    pub mod domain {
        pub mod frame_painter;
    }
    pub mod infrastructure;
}

pub mod archive {
    pub mod saved_image_archive;
    pub mod domain {
        pub mod image_writer;
    }
    pub mod infrastructure;
}

pub mod capture {
    pub mod domain {
        pub mod frame_source;
    }
    pub mod infrastructure;
}

pub mod detection {
    pub mod domain {
        pub mod detection_config;
        pub mod face_detector;
    }
    pub mod infrastructure;
}

pub mod session {
    pub mod capture_session;
    pub mod session_driver;
    pub mod session_reporter;
    pub mod session_state;
}

pub mod shared {
    pub mod box_color;
    pub mod constants;
    pub mod detection;
    pub mod frame;
    pub mod settings;
}
