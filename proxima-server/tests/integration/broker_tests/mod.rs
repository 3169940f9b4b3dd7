mod test_concurrent_updates;
mod test_departure_detection;
