pub mod opencv_cascade_detector;
