pub mod execution_provider;
pub mod model_resolver;
pub mod onnx_yolo_detector;
pub mod onnx_yolo_face_model;
pub mod onnx_yolo_landmark_predictor;
