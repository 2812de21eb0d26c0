//! Pipeline scenarios and shared test doubles.
