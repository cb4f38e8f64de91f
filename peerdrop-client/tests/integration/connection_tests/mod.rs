mod test_peers_connect;
mod test_simultaneous_connect;
