pub mod rectangle_painter;
