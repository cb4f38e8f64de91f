mod test_chat_broadcast;
mod test_handshake_forwarding;
mod test_relay_isolation;
