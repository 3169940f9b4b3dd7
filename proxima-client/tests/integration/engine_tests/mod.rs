mod test_handshake;
mod test_peer_positions;
